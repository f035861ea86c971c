use std::collections::{HashMap, HashSet};
use regex::{Captures, Regex};
use lazy_static::lazy_static;

lazy_static! {
    pub(crate) static ref PLACEHOLDER_MATCH_RE: Regex = Regex::new(r"\{\[.*?\]\}").unwrap();
}

#[inline]
pub(crate) fn strip_format(key: &str) -> &str {
    //! Strips "{\[" and "\]}" for a string, which is algorithmically unsafe.
    //! Ensure the string is properly formatted like "{\[a\]}".
    &key[2..key.len() - 2]
}

/// Format a placeholder name into its template form, `name` -> `{[name]}`.
#[inline]
pub fn to_placeholder(name: &str) -> String {
    format!("{{[{}]}}", name)
}

/// Replaces every placeholder that has a value in `mapping`. Placeholders that are missing from the mapping or
/// mapped to `None` are left untouched.
pub(crate) fn replace_placeholders(original: &str, mapping: &HashMap<String, Option<String>>) -> String {
    PLACEHOLDER_MATCH_RE.replace_all(original, |captures: &Captures| {
        let match_text = &captures[0];
        let key = strip_format(match_text);
        match mapping.get(key) {
            Some(Some(replacement)) => replacement.clone(),
            _ => match_text.to_string(),
        }
    }).to_string()
}

pub fn get_placeholders(string: &str) -> HashSet<String> {
    PLACEHOLDER_MATCH_RE.captures_iter(string)
        .map(|captures| strip_format(&captures[0]).to_string())
        .collect()
}
