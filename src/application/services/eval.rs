//! Operator eval sandbox
//!
//! Runs a code fragment through a configured interpreter. The fragment is syntax-checked
//! first, then executed as a child process whose environment holds only an explicit set
//! of bindings describing the invocation. Output is captured, the live token redacted,
//! and the result reported back to the invoking channel with a reaction marker.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::application::errors::CommandError;
use crate::application::messaging::Context;
use crate::application::services::text::{fence_overhead, fenced, paginate, redact, MAX_MESSAGE_LEN};

/// Reaction added to the last successful output message
pub const SUCCESS_MARKER: &str = "\u{2705}";

/// Reaction added to failure reports
pub const FAILURE_MARKER: &str = "\u{2049}";

/// Name of the function the fragment is wrapped in
const WRAPPER_FN: &str = "statsbot_eval";

/// Default cap on captured bytes per stream
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// How long output readers may lag behind the interpreter's exit
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Interpreter settings
#[derive(Debug, Clone)]
pub struct EvalSettings {
    pub interpreter: String,
    /// Arguments that make the interpreter only parse the script
    pub check_args: Vec<String>,
    /// Flag preceding the inline script
    pub script_flag: String,
    /// Language tag for reply code fences
    pub language: String,
    /// `PATH` exposed to the fragment
    pub helper_path: String,
    pub timeout: Option<Duration>,
    /// Bytes kept per output stream; the rest is drained and dropped
    pub max_output_bytes: usize,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            interpreter: "sh".to_string(),
            check_args: vec!["-n".to_string()],
            script_flag: "-c".to_string(),
            language: "sh".to_string(),
            helper_path: "/usr/local/bin:/usr/bin:/bin".to_string(),
            timeout: None,
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    CompileFailed { message: String },
    RuntimeFailed { output: String, trace: String },
    Completed { output: String },
}

struct Execution {
    /// `None` when the run was cut short by the timeout
    status: Option<ExitStatus>,
    stdout: String,
    stderr: String,
}

pub struct EvalSandbox {
    settings: EvalSettings,
}

impl EvalSandbox {
    pub fn new(settings: EvalSettings) -> Self {
        Self { settings }
    }

    /// Compile and execute a fragment. Failures are returned as outcomes, never raised.
    pub async fn evaluate(&self, raw: &str, ctx: &Context) -> EvalOutcome {
        let body = cleanup_code(raw);
        let script = wrap(&body);
        let bindings = bindings(ctx, &self.settings.helper_path);

        match self.execute(&self.settings.check_args, &script, &bindings, None).await {
            Ok(check) if check.status.map(|s| s.success()).unwrap_or(false) => {}
            Ok(check) => {
                return EvalOutcome::CompileFailed {
                    message: format!("CompileError: {}", check.stderr.trim_end()),
                };
            }
            Err(e) => {
                return EvalOutcome::CompileFailed {
                    message: format!("CompileError: cannot start {}: {}", self.settings.interpreter, e),
                };
            }
        }

        let run = match self.execute(&[], &script, &bindings, self.settings.timeout).await {
            Ok(run) => run,
            Err(e) => {
                return EvalOutcome::RuntimeFailed {
                    output: String::new(),
                    trace: format!("RuntimeError: cannot start {}: {}", self.settings.interpreter, e),
                };
            }
        };

        match run.status {
            Some(status) if status.success() => EvalOutcome::Completed { output: run.stdout },
            Some(status) => EvalOutcome::RuntimeFailed {
                output: run.stdout,
                trace: format!("RuntimeError: {}\n{}", describe(status), run.stderr.trim_end()),
            },
            None => EvalOutcome::RuntimeFailed {
                output: run.stdout,
                trace: format!(
                    "TimeoutError: evaluation exceeded {:?}\n{}",
                    self.settings.timeout.unwrap_or_default(),
                    run.stderr.trim_end()
                ),
            },
        }
    }

    /// Evaluate and report the outcome to the invoking channel
    pub async fn run(&self, raw: &str, ctx: &Context) -> Result<(), CommandError> {
        let outcome = self.evaluate(raw, ctx).await;
        self.report(outcome, ctx).await
    }

    /// Send an outcome, paginated, with the matching reaction on the final page
    pub async fn report(&self, outcome: EvalOutcome, ctx: &Context) -> Result<(), CommandError> {
        let token = ctx.state.settings.token.as_str();
        match outcome {
            EvalOutcome::CompileFailed { message } => {
                tracing::debug!("eval compile failure: {}", message);
                self.send_pages(ctx, &redact(&message, token), FAILURE_MARKER).await
            }
            EvalOutcome::RuntimeFailed { output, trace } => {
                tracing::debug!("eval runtime failure: {}", trace);
                let text = format!("{}{}", output, trace);
                self.send_pages(ctx, &redact(&text, token), FAILURE_MARKER).await
            }
            EvalOutcome::Completed { output } => {
                let output = redact(&output, token);
                if output.trim().is_empty() {
                    return ctx.react(&ctx.message.id, SUCCESS_MARKER).await;
                }
                self.send_pages(ctx, &output, SUCCESS_MARKER).await
            }
        }
    }

    async fn send_pages(&self, ctx: &Context, text: &str, marker: &str) -> Result<(), CommandError> {
        let language = self.settings.language.as_str();
        let limit = MAX_MESSAGE_LEN - fence_overhead(language);
        let text = text.trim_end_matches('\n');
        let mut pages = paginate(text, limit);
        if pages.is_empty() {
            pages.push(String::new());
        }

        let mut last_id = None;
        for page in &pages {
            last_id = Some(ctx.send(fenced(language, page.trim_end_matches('\n'))).await?);
        }
        if let Some(id) = last_id {
            ctx.react(&id, marker).await?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        args: &[String],
        script: &str,
        bindings: &[(&'static str, String)],
        timeout: Option<Duration>,
    ) -> std::io::Result<Execution> {
        let mut command = Command::new(&self.settings.interpreter);
        command
            .args(args)
            .arg(&self.settings.script_flag)
            .arg(script)
            .env_clear()
            .envs(bindings.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // helpers the fragment starts share the interpreter's group and die with it
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn()?;
        let pid = child.id();

        let cap = self.settings.max_output_bytes;
        let stdout = child.stdout.take().map(|s| tokio::spawn(read_capped(s, cap)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(read_capped(s, cap)));

        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => {
                    tracing::warn!("eval exceeded {:?}, killing interpreter", limit);
                    kill_group(pid);
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Failed to kill eval interpreter: {}", e);
                    }
                    None
                }
            },
            None => Some(child.wait().await?),
        };
        // background jobs left behind by the fragment would keep the pipes open
        kill_group(pid);

        Ok(Execution {
            status,
            stdout: join_output(stdout).await,
            stderr: join_output(stderr).await,
        })
    }
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|p| libc::pid_t::try_from(p).ok()) else {
        return;
    };
    let result = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        // ESRCH: the group is already gone
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!("Failed to kill eval process group {}: {}", pgid, err);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Read a stream to its end, keeping at most `limit` bytes
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut dropped = 0usize;
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let keep = n.min(limit.saturating_sub(buf.len()));
                buf.extend_from_slice(&chunk[..keep]);
                dropped += n - keep;
            }
            Err(e) => {
                tracing::debug!("eval output stream closed early: {}", e);
                break;
            }
        }
    }
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if dropped > 0 {
        text.push_str(&format!("\n[output truncated: {} bytes dropped]\n", dropped));
    }
    text
}

async fn join_output(task: Option<tokio::task::JoinHandle<String>>) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match tokio::time::timeout(OUTPUT_GRACE, &mut task).await {
        Ok(output) => output.unwrap_or_default(),
        Err(_) => {
            tracing::warn!("eval output still open {:?} after exit, dropping it", OUTPUT_GRACE);
            task.abort();
            String::new()
        }
    }
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Remove surrounding code fences: a fenced block keeps its inner lines,
/// anything else loses leading and trailing backticks, spaces and newlines.
pub fn cleanup_code(content: &str) -> String {
    if content.starts_with("```") && content.ends_with("```") && content.len() >= 6 {
        let lines: Vec<&str> = content.split('\n').collect();
        if lines.len() < 2 {
            return String::new();
        }
        return lines[1..lines.len() - 1].join("\n");
    }
    content
        .trim_matches(|c| c == '`' || c == ' ' || c == '\n')
        .to_string()
}

/// Wrap the fragment in a function body and call it
fn wrap(body: &str) -> String {
    format!("{f}() {{\n:\n{body}\n}}\n{f}\n", f = WRAPPER_FN, body = body)
}

/// The only environment the fragment sees
fn bindings(ctx: &Context, helper_path: &str) -> Vec<(&'static str, String)> {
    let state = &ctx.state;
    let me = state.gateway.current_user();
    vec![
        ("PATH", helper_path.to_string()),
        ("GUILD_ID", ctx.guild_id().unwrap_or_default().to_string()),
        ("CHANNEL_ID", ctx.channel_id().to_string()),
        ("AUTHOR_ID", ctx.author().id.clone()),
        ("AUTHOR_NAME", ctx.author().display_name()),
        ("MESSAGE_ID", ctx.message.id.clone()),
        ("MESSAGE", ctx.message.content.clone()),
        ("PREFIX", ctx.prefix.clone().unwrap_or_default()),
        ("BOT_ID", me.id),
        ("BOT_PID", std::process::id().to_string()),
        ("LATENCY_MS", format!("{:.4}", state.gateway.latency().as_secs_f64() * 1000.0)),
        ("COMMANDS_RUN", state.usage.total().to_string()),
        ("MESSAGES_SEEN", state.usage.messages_seen().to_string()),
    ]
}
