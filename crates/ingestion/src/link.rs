//! Link extraction from link-source messages

use once_cell::sync::Lazy;
use regex::Regex;

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://\S+|www\.\S+)").expect("link pattern compiles"));

/// First URL-like token of a message text
///
/// Recognizes `http://`, `https://` and `www.` prefixes; the token runs to
/// the next whitespace.
pub fn extract_link(text: &str) -> Option<String> {
    LINK_PATTERN.find(text).map(|m| m.as_str().to_string())
}
