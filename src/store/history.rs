//! Bounded list of recent search terms, most recent first.

/// Maximum number of remembered search terms.
pub const MAX_HISTORY_ENTRIES: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHistory {
    terms: Vec<String>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted list, enforcing the cap.
    pub fn from_terms(mut terms: Vec<String>) -> Self {
        terms.truncate(MAX_HISTORY_ENTRIES);
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Move `term` to the front, dropping its older duplicate and anything past the cap.
    /// Blank terms are ignored; returns whether the list changed.
    pub fn record(&mut self, term: &str) -> bool {
        if term.trim().is_empty() {
            return false;
        }
        if self.terms.first().map(String::as_str) == Some(term) {
            return false;
        }

        self.terms.retain(|existing| existing != term);
        self.terms.insert(0, term.to_string());
        self.terms.truncate(MAX_HISTORY_ENTRIES);
        true
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }
}
