use regex::{Regex, RegexBuilder};

/// Case-insensitive matcher for the active search text, used to emphasise
/// hits in titles and previews. Returns `None` when there is nothing to
/// highlight.
pub fn build_highlight_regex(query: &str) -> Option<Regex> {
    if query.trim().is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into `(segment, is_match)` runs.
pub fn split_matches<'a>(text: &'a str, regex: Option<&Regex>) -> Vec<(&'a str, bool)> {
    let Some(regex) = regex else {
        return vec![(text, false)];
    };
    let mut parts = Vec::new();
    let mut last = 0;
    for found in regex.find_iter(text) {
        if found.start() > last {
            parts.push((&text[last..found.start()], false));
        }
        parts.push((found.as_str(), true));
        last = found.end();
    }
    if last < text.len() || parts.is_empty() {
        parts.push((&text[last..], false));
    }
    parts
}
