//! Autocomplete suggestions from recent searches and file names.

use std::collections::HashSet;

/// Recent searches offered for an empty query.
pub const RECENT_SUGGESTIONS: usize = 5;
/// Upper bound on suggestions for a non-empty query.
pub const MAX_SUGGESTIONS: usize = 10;

/// Suggest completions for `query`.
///
/// Matching recent searches come first, then matching file names; duplicates
/// are dropped.
pub fn get_search_suggestions(query: &str, recent_searches: &[String], file_names: &[String]) -> Vec<String> {
    if query.trim().is_empty() {
        return recent_searches.iter().take(RECENT_SUGGESTIONS).cloned().collect();
    }

    let needle = query.to_lowercase();
    let mut seen: HashSet<&str> = HashSet::new();
    recent_searches
        .iter()
        .chain(file_names)
        .filter(|candidate| candidate.to_lowercase().contains(&needle))
        .filter(|candidate| seen.insert(candidate.as_str()))
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect()
}
