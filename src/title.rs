// title.rs - Draft title from the generated article

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_FALLBACK_TITLE_CHARS: usize = 100;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<h1>(.*?)</h1>|<h2>(.*?)</h2>").expect("valid heading regex")
});

/// Title for the draft: the first non-empty `<h1>` or `<h2>` in the document,
/// whichever comes first. Otherwise the first line of the user's argument, cut at 100
/// characters, and `default_title` when that is empty too.
pub fn extract_title(document: &str, user_argument: &str, default_title: &str) -> String {
    let heading = HEADING_RE
        .captures_iter(document)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .find(|heading| !heading.is_empty());
    if let Some(heading) = heading {
        return heading.to_string();
    }

    let first_line: String = user_argument
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .take(MAX_FALLBACK_TITLE_CHARS)
        .collect();
    if first_line.is_empty() {
        default_title.to_string()
    } else {
        first_line
    }
}
