//! Message parser - Splits a prefixed message into command token and arguments

/// A parsed invocation, borrowed from the message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvocation<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

/// Parses message text after prefix resolution
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Strip `prefix` and split the remainder into command token and argument string.
    /// Returns `None` if the text does not start with the prefix or names no command.
    pub fn parse<'a>(&self, text: &'a str, prefix: &str) -> Option<ParsedInvocation<'a>> {
        let rest = text.strip_prefix(prefix)?.trim_start();
        if rest.is_empty() {
            return None;
        }
        let (name, args) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };
        Some(ParsedInvocation { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_args() {
        let parsed = MessageParser::new().parse("#prefix !! ", "#").unwrap();
        assert_eq!(parsed.name, "prefix");
        assert_eq!(parsed.args, "!!");
    }

    #[test]
    fn test_parse_keeps_inner_argument_text() {
        let parsed = MessageParser::new()
            .parse("#eval echo a\necho  b", "#")
            .unwrap();
        assert_eq!(parsed.name, "eval");
        assert_eq!(parsed.args, "echo a\necho  b");
    }

    #[test]
    fn test_parse_tolerates_space_after_prefix() {
        let parsed = MessageParser::new().parse("P ping", "P").unwrap();
        assert_eq!(parsed.name, "ping");
        assert_eq!(parsed.args, "");
    }

    #[test]
    fn test_parse_mention_prefix() {
        let parsed = MessageParser::new().parse("<@42> help", "<@42> ").unwrap();
        assert_eq!(parsed.name, "help");
    }

    #[test]
    fn test_parse_rejects_bare_prefix_and_other_text() {
        let parser = MessageParser::new();
        assert!(parser.parse("#", "#").is_none());
        assert!(parser.parse("#   ", "#").is_none());
        assert!(parser.parse("hello", "#").is_none());
    }
}
