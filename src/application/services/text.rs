//! Reply text helpers: secret redaction and pagination

use std::borrow::Cow;

/// Maximum length of a single chat message
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Placeholder substituted for the live token
pub const REDACTED: &str = "[EXPUNGED]";

/// Replace every occurrence of `secret` in `text`
pub fn redact<'a>(text: &'a str, secret: &str) -> Cow<'a, str> {
    if secret.is_empty() || !text.contains(secret) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace(secret, REDACTED))
}

/// Split `text` into pages of at most `limit` bytes, preferring line breaks.
/// Lines longer than a page are cut on character boundaries.
pub fn paginate(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut pages = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.len() + line.len() <= limit {
            current.push_str(line);
            continue;
        }
        if !current.is_empty() {
            pages.push(std::mem::take(&mut current));
        }
        let mut rest = line;
        while rest.len() > limit {
            let mut cut = limit;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                // a single character wider than the limit
                cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
            }
            pages.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current.push_str(rest);
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

/// Wrap text in a code fence
pub fn fenced(language: &str, body: &str) -> String {
    format!("```{}\n{}\n```", language, body)
}

/// Bytes a code fence adds around its body
pub fn fence_overhead(language: &str) -> usize {
    fenced(language, "").len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_replaces_every_occurrence() {
        let out = redact("a TOKEN b TOKEN", "TOKEN");
        assert_eq!(out, "a [EXPUNGED] b [EXPUNGED]");
    }

    #[test]
    fn test_redact_empty_secret_is_noop() {
        assert_eq!(redact("abc", ""), "abc");
    }

    #[test]
    fn test_paginate_short_text_single_page() {
        assert_eq!(paginate("hello", 10), vec!["hello".to_string()]);
        assert!(paginate("", 10).is_empty());
    }

    #[test]
    fn test_paginate_prefers_line_breaks() {
        let pages = paginate("aaaa\nbbbb\ncccc\n", 10);
        assert_eq!(pages, vec!["aaaa\nbbbb\n".to_string(), "cccc\n".to_string()]);
    }

    #[test]
    fn test_paginate_bounds_every_page() {
        let text = "x".repeat(4500);
        let pages = paginate(&text, 1990);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.len() <= 1990));
        assert_eq!(pages.concat(), text);
    }

    #[test]
    fn test_paginate_respects_char_boundaries() {
        let text = "é".repeat(10);
        let pages = paginate(&text, 3);
        assert!(pages.iter().all(|p| p.len() <= 3));
        assert_eq!(pages.concat(), text);
    }

    #[test]
    fn test_fence_overhead() {
        assert_eq!(fence_overhead("sh"), "```sh\n\n```".len());
    }
}
