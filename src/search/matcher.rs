//! Case-insensitive literal matching and highlighting.

use regex::{Regex, RegexBuilder};

/// Characters kept on each side of a content match.
pub const CONTEXT_RADIUS: usize = 50;

/// Literal, case-insensitive matcher for a user query.
///
/// Regex metacharacters in the query are escaped, so `(test)` matches the
/// literal text `(test)`.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    pattern: Regex,
}

impl QueryMatcher {
    /// Build a matcher, `None` for an empty query.
    pub fn new(query: &str) -> Option<Self> {
        if query.is_empty() {
            return None;
        }

        match RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => Some(Self { pattern }),
            Err(e) => {
                tracing::debug!("Unusable search query {:?}: {}", query, e);
                None
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Byte range of the first match in `text`.
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.pattern.find(text).map(|m| (m.start(), m.end()))
    }

    /// Wrap every match in `<mark>` tags, keeping the matched text as written.
    pub fn highlight(&self, text: &str) -> String {
        self.pattern.replace_all(text, "<mark>${0}</mark>").into_owned()
    }
}

/// Highlight every case-insensitive occurrence of `query` in `text`.
pub fn highlight_text(text: &str, query: &str) -> String {
    match QueryMatcher::new(query) {
        Some(matcher) => matcher.highlight(text),
        None => text.to_string(),
    }
}

/// Up to `radius` characters either side of `text[start..end]`, trimmed and
/// wrapped in ellipses.
pub fn context_window(text: &str, start: usize, end: usize, radius: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    format!("...{}...", text[from..to].trim())
}
