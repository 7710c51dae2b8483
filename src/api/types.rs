//! Request and response bodies of the JSON API.

use serde::{Deserialize, Serialize};

use crate::search::SearchResult;

/// Body of `POST /rooms` and every rename.
#[derive(Debug, Serialize, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub parent_folder_id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub new_parent_folder_id: String,
}

/// Query of `POST /folders/:id/files`.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

/// Search result with `<mark>` highlighting applied.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub result: SearchResult,
    pub highlighted_name: String,
    pub highlighted_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}
