//! Process-wide usage counters

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Invocations per command plus a raw inbound message counter.
/// Lives for the whole process and is never persisted.
#[derive(Debug, Default)]
pub struct UsageCounters {
    commands: Mutex<HashMap<String, u64>>,
    messages: AtomicU64,
}

impl UsageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one invocation. Qualified names have spaces replaced with underscores.
    pub fn increment(&self, command: &str) {
        let key = command.replace(' ', "_");
        let mut commands = match self.commands.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *commands.entry(key).or_insert(0) += 1;
    }

    /// Count one inbound message
    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_seen(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Sum of all command invocations
    pub fn total(&self) -> u64 {
        self.snapshot().values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_and_snapshot() {
        let usage = UsageCounters::new();
        usage.increment("ping");
        usage.increment("ping");
        usage.increment("tag show");

        let snapshot = usage.snapshot();
        assert_eq!(snapshot.get("ping"), Some(&2));
        assert_eq!(snapshot.get("tag_show"), Some(&1));
        assert_eq!(usage.total(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_increments() {
        let usage = Arc::new(UsageCounters::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let usage = Arc::clone(&usage);
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    usage.increment("help");
                    usage.record_message();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(usage.snapshot().get("help"), Some(&1600));
        assert_eq!(usage.messages_seen(), 1600);
    }
}
