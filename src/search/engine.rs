//! Name and content search over one data room.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::extract::{extract_pdf_text, TextExtractor};
use super::matcher::{context_window, QueryMatcher, CONTEXT_RADIUS};
use super::types::{MatchType, SearchFilters, SearchResult};
use crate::store::{FileContent, Folder, RoomSnapshot, Timestamp, ROOT_FOLDER_NAME};

/// Display path of a folder: its ancestors' names joined by `/`, root omitted.
pub fn get_file_path(folder_id: Option<&str>, folders: &HashMap<String, Folder>) -> String {
    let mut names = Vec::new();
    let mut current = folder_id;
    let mut hops = 0;

    while let Some(id) = current {
        let Some(folder) = folders.get(id) else {
            break;
        };
        if folder.name != ROOT_FOLDER_NAME {
            names.push(folder.name.as_str());
        }
        hops += 1;
        if hops > folders.len() {
            break;
        }
        current = folder.parent_folder_id.as_deref();
    }

    names.reverse();
    format!("/{}", names.join("/"))
}

fn to_result(
    file: &FileContent,
    snapshot: &RoomSnapshot,
    match_type: MatchType,
    matched_text: String,
) -> SearchResult {
    SearchResult {
        file_id: file.record.id.clone(),
        file_name: file.record.name.clone(),
        parent_folder_path: get_file_path(file.record.parent_folder_id.as_deref(), &snapshot.folders),
        data_room_id: snapshot.data_room.id.clone(),
        data_room_name: snapshot.data_room.name.clone(),
        match_type,
        matched_text: Some(matched_text),
        created_at: file.record.created_at,
        size: file.record.size,
        file_type: file.record.mime_type.clone(),
    }
}

fn sort_newest_first(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Files whose name contains `query`, ignoring case; newest first.
pub fn search_by_name(query: &str, snapshot: &RoomSnapshot) -> Vec<SearchResult> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let Some(matcher) = QueryMatcher::new(query) else {
        return Vec::new();
    };

    let mut results: Vec<SearchResult> = snapshot
        .files
        .iter()
        .filter(|file| matcher.is_match(file.name()))
        .map(|file| to_result(file, snapshot, MatchType::Name, file.record.name.clone()))
        .collect();
    sort_newest_first(&mut results);
    results
}

/// Keep results created within `[from, to]`.
pub fn filter_by_date_range(
    results: Vec<SearchResult>,
    from: Option<Timestamp>,
    to: Option<Timestamp>,
) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| from.map_or(true, |from| r.created_at >= from))
        .filter(|r| to.map_or(true, |to| r.created_at <= to))
        .collect()
}

/// Keep results whose size lies within `[min, max]`.
pub fn filter_by_size(results: Vec<SearchResult>, min: Option<u64>, max: Option<u64>) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| min.map_or(true, |min| r.size >= min))
        .filter(|r| max.map_or(true, |max| r.size <= max))
        .collect()
}

/// Keep results whose MIME type starts with `file_type`, ignoring case.
pub fn filter_by_type(results: Vec<SearchResult>, file_type: &str) -> Vec<SearchResult> {
    let wanted = file_type.to_lowercase();
    results
        .into_iter()
        .filter(|r| r.file_type.to_lowercase().starts_with(&wanted))
        .collect()
}

/// Runs searches against a room snapshot, extracting PDF text on demand.
#[derive(Clone)]
pub struct SearchEngine {
    extractor: Arc<dyn TextExtractor>,
}

impl SearchEngine {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// PDFs whose extracted text contains `query`, ignoring case; newest first.
    ///
    /// Files are extracted one at a time. A file that fails to extract is
    /// treated as having no text.
    pub async fn search_by_content(&self, query: &str, snapshot: &RoomSnapshot) -> Vec<SearchResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let Some(matcher) = QueryMatcher::new(query) else {
            return Vec::new();
        };

        let mut results = Vec::new();
        for file in &snapshot.files {
            if !file.is_pdf() {
                continue;
            }
            let Some(data) = &file.data else {
                continue;
            };

            let text = extract_pdf_text(self.extractor.as_ref(), data).await;
            if let Some((start, end)) = matcher.find(&text) {
                let excerpt = context_window(&text, start, end, CONTEXT_RADIUS);
                results.push(to_result(file, snapshot, MatchType::Content, excerpt));
            }
        }

        sort_newest_first(&mut results);
        results
    }

    /// Full search: name and content matches, one result per file, filtered,
    /// name matches first and newest first within each kind.
    pub async fn perform_search(&self, filters: &SearchFilters, snapshot: &RoomSnapshot) -> Vec<SearchResult> {
        if filters.query.trim().is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        if filters.search_in_names {
            results.extend(search_by_name(&filters.query, snapshot));
        }
        if filters.search_in_content {
            results.extend(self.search_by_content(&filters.query, snapshot).await);
        }

        let mut seen = HashSet::new();
        results.retain(|r| seen.insert(r.file_id.clone()));

        if filters.date_from.is_some() || filters.date_to.is_some() {
            results = filter_by_date_range(results, filters.date_from, filters.date_to);
        }
        if filters.size_min.is_some() || filters.size_max.is_some() {
            results = filter_by_size(results, filters.size_min, filters.size_max);
        }
        if let Some(file_type) = filters.file_type.as_deref().filter(|t| !t.is_empty()) {
            results = filter_by_type(results, file_type);
        }

        results.sort_by(|a, b| {
            a.match_type
                .cmp(&b.match_type)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        tracing::debug!(
            "Search {:?} in '{}' returned {} results",
            filters.query,
            snapshot.data_room.name,
            results.len()
        );
        results
    }
}
