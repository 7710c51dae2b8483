//! Search request and result types.

use serde::{Deserialize, Serialize};

use crate::store::Timestamp;

/// How a result matched. Name matches rank before content matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Name,
    Content,
}

/// One file matched by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub file_id: String,
    pub file_name: String,
    /// `/`-joined folder names, `/` for the root.
    pub parent_folder_path: String,
    pub data_room_id: String,
    pub data_room_name: String,
    pub match_type: MatchType,
    /// File name for name matches, surrounding text for content matches.
    pub matched_text: Option<String>,
    pub created_at: Timestamp,
    pub size: u64,
    pub file_type: String,
}

fn default_true() -> bool {
    true
}

/// Query plus optional filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub query: String,
    /// MIME type prefix, e.g. `application/pdf`.
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default = "default_true")]
    pub search_in_content: bool,
    #[serde(default = "default_true")]
    pub search_in_names: bool,
    #[serde(default)]
    pub date_from: Option<Timestamp>,
    #[serde(default)]
    pub date_to: Option<Timestamp>,
    #[serde(default)]
    pub size_min: Option<u64>,
    #[serde(default)]
    pub size_max: Option<u64>,
}

impl SearchFilters {
    /// Search names and content for `query` without further filtering.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            file_type: None,
            search_in_content: true,
            search_in_names: true,
            date_from: None,
            date_to: None,
            size_min: None,
            size_max: None,
        }
    }
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self::new("")
    }
}
