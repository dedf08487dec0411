//! Player tag validation

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::application::errors::CommandError;

/// Document holding saved tags, keyed by author id
pub const TAGS_DOCUMENT: &str = "tags";

/// Characters a player tag may contain
pub const TAG_ALPHABET: &str = "0289PYLQGRJCUV";

/// Fixed explanation sent when a tag is rejected
pub const INVALID_TAG_HELP: &str = "Player tags should only contain these characters:\n\
**Numbers:** 0, 2, 8, 9\n\
**Letters:** P, Y, L, Q, G, R, J, C, U, V";

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[{}]+$", TAG_ALPHABET)).expect("tag pattern is valid")
});

/// Normalize a tag: strip a leading `#`, surrounding whitespace, and uppercase.
/// Fails with [`CommandError::InvalidTag`] if anything outside the alphabet remains.
pub fn validate_tag(raw: &str) -> Result<String, CommandError> {
    let tag = raw.trim().trim_start_matches('#').to_uppercase();
    if TAG_PATTERN.is_match(&tag) {
        Ok(tag)
    } else {
        Err(CommandError::InvalidTag(raw.to_string()))
    }
}
