#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::config::StoreLimits;
    use crate::search::{
        filter_by_date_range, filter_by_size, get_file_path, search_by_name, ExtractError,
        MatchType, SearchEngine, SearchFilters, SearchResult, TextExtractor,
    };
    use crate::store::{
        DataRoom, DataRoomStore, FileContent, FileRecord, Folder, MemoryBackend, NodeRef,
        RoomSnapshot, ROOT_FOLDER_NAME,
    };

    /// Treats the payload as UTF-8 text; payloads starting with `bad` fail.
    struct PlainTextExtractor;

    #[async_trait]
    impl TextExtractor for PlainTextExtractor {
        async fn extract_text(&self, data: Bytes) -> Result<String, ExtractError> {
            if data.starts_with(b"bad") {
                return Err(ExtractError::Document("corrupt".to_string()));
            }
            Ok(String::from_utf8_lossy(&data).into_owned())
        }
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(Arc::new(PlainTextExtractor))
    }

    fn folder(id: &str, name: &str, parent: Option<&str>, children: Vec<NodeRef>) -> Folder {
        Folder {
            id: id.to_string(),
            name: name.to_string(),
            parent_folder_id: parent.map(str::to_string),
            created_at: 0,
            updated_at: 0,
            children,
        }
    }

    fn file(id: &str, name: &str, parent: &str, created_at: i64, mime_type: &str, data: Option<&str>) -> FileContent {
        let data = data.map(|text| Bytes::from(text.to_string()));
        FileContent {
            record: FileRecord {
                id: id.to_string(),
                name: name.to_string(),
                parent_folder_id: Some(parent.to_string()),
                size: data.as_ref().map_or(0, |d| d.len() as u64),
                mime_type: mime_type.to_string(),
                created_at,
                updated_at: created_at,
            },
            data,
        }
    }

    /// root -> Finance -> Q3, files spread over the three folders.
    fn snapshot() -> RoomSnapshot {
        let files = vec![
            file("f1", "Budget 2023.pdf", "finance", 100, "application/pdf", Some("last year's numbers")),
            file("f2", "notes.pdf", "q3", 300, "application/pdf", Some("The approved budget for Q3 is final.")),
            file("f3", "budget.txt", "root", 200, "text/plain", Some("budget in plain text")),
            file("f4", "scan.pdf", "q3", 400, "application/octet-stream", Some("bad bytes mention budget")),
            file("f5", "empty.pdf", "root", 500, "application/pdf", None),
            file("f6", "BUDGET final", "q3", 600, "application/pdf", Some("budget budget")),
        ];

        let mut folders = HashMap::new();
        folders.insert(
            "root".to_string(),
            folder(
                "root",
                ROOT_FOLDER_NAME,
                None,
                vec![NodeRef::folder("finance"), NodeRef::file("f3"), NodeRef::file("f5")],
            ),
        );
        folders.insert(
            "finance".to_string(),
            folder("finance", "Finance", Some("root"), vec![NodeRef::folder("q3"), NodeRef::file("f1")]),
        );
        folders.insert(
            "q3".to_string(),
            folder(
                "q3",
                "Q3",
                Some("finance"),
                vec![NodeRef::file("f2"), NodeRef::file("f4"), NodeRef::file("f6")],
            ),
        );

        RoomSnapshot {
            data_room: DataRoom {
                id: "room".to_string(),
                name: "Acquisition".to_string(),
                created_at: 0,
                updated_at: 0,
                root_folder_id: "root".to_string(),
            },
            files,
            folders,
        }
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.file_id.as_str()).collect()
    }

    fn sized(id: &str, size: u64, created_at: i64) -> SearchResult {
        SearchResult {
            file_id: id.to_string(),
            file_name: format!("{}.pdf", id),
            parent_folder_path: "/".to_string(),
            data_room_id: "room".to_string(),
            data_room_name: "Room".to_string(),
            match_type: MatchType::Name,
            matched_text: None,
            created_at,
            size,
            file_type: "application/pdf".to_string(),
        }
    }

    #[test]
    fn test_search_by_name_is_case_insensitive() {
        let snapshot = snapshot();
        let upper = search_by_name("BUDGET", &snapshot);
        let lower = search_by_name("budget", &snapshot);
        assert_eq!(upper, lower);
        assert_eq!(ids(&upper), vec!["f6", "f3", "f1"]);
        assert!(upper.iter().all(|r| r.match_type == MatchType::Name));
        assert_eq!(upper[2].matched_text.as_deref(), Some("Budget 2023.pdf"));
    }

    #[test]
    fn test_search_by_name_empty_query_is_empty() {
        assert!(search_by_name("", &snapshot()).is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_query_matches_nothing() {
        // "Budget 2023.pdf" and "BUDGET final" both contain a space.
        assert!(search_by_name(" ", &snapshot()).is_empty());
        assert!(search_by_name("\t ", &snapshot()).is_empty());
        assert!(engine().search_by_content("  ", &snapshot()).await.is_empty());
    }

    #[test]
    fn test_results_carry_folder_path_and_room() {
        let results = search_by_name("notes", &snapshot());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].parent_folder_path, "/Finance/Q3");
        assert_eq!(results[0].data_room_id, "room");
        assert_eq!(results[0].data_room_name, "Acquisition");
        assert_eq!(results[0].file_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_search_by_content_scans_pdfs_only() {
        let results = engine().search_by_content("BUDGET", &snapshot()).await;

        // f3 is not a PDF, f4 fails to extract, f5 has no payload.
        assert_eq!(ids(&results), vec!["f6", "f2"]);
        assert!(results.iter().all(|r| r.match_type == MatchType::Content));
        assert_eq!(
            results[1].matched_text.as_deref(),
            Some("...The approved budget for Q3 is final....")
        );
    }

    #[tokio::test]
    async fn test_perform_search_dedupes_keeping_name_match() {
        let results = engine()
            .perform_search(&SearchFilters::new("budget"), &snapshot())
            .await;

        assert_eq!(ids(&results), vec!["f6", "f3", "f1", "f2"]);
        let f6 = results.iter().find(|r| r.file_id == "f6").unwrap();
        assert_eq!(f6.match_type, MatchType::Name);

        let mut unique = ids(&results);
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), results.len());
    }

    #[tokio::test]
    async fn test_perform_search_blank_query_is_empty() {
        let engine = engine();
        let snapshot = snapshot();
        assert!(engine.perform_search(&SearchFilters::new(""), &snapshot).await.is_empty());
        assert!(engine.perform_search(&SearchFilters::new("   "), &snapshot).await.is_empty());
    }

    #[tokio::test]
    async fn test_perform_search_respects_mode_flags() {
        let engine = engine();
        let snapshot = snapshot();

        let mut content_only = SearchFilters::new("budget");
        content_only.search_in_names = false;
        let results = engine.perform_search(&content_only, &snapshot).await;
        assert_eq!(ids(&results), vec!["f6", "f2"]);

        let mut names_only = SearchFilters::new("budget");
        names_only.search_in_content = false;
        let results = engine.perform_search(&names_only, &snapshot).await;
        assert_eq!(ids(&results), vec!["f6", "f3", "f1"]);
    }

    #[tokio::test]
    async fn test_perform_search_applies_filters() {
        let engine = engine();
        let snapshot = snapshot();

        let mut filters = SearchFilters::new("budget");
        filters.date_from = Some(150);
        filters.date_to = Some(300);
        let results = engine.perform_search(&filters, &snapshot).await;
        assert_eq!(ids(&results), vec!["f3", "f2"]);

        let mut filters = SearchFilters::new("budget");
        filters.file_type = Some("TEXT/".to_string());
        let results = engine.perform_search(&filters, &snapshot).await;
        assert_eq!(ids(&results), vec!["f3"]);
    }

    #[test]
    fn test_filter_by_size_inclusive_bounds() {
        let results = vec![sized("a", 1024, 1), sized("b", 2048, 2)];
        let filtered = filter_by_size(results.clone(), Some(500), Some(1500));
        assert_eq!(ids(&filtered), vec!["a"]);

        let filtered = filter_by_size(results.clone(), Some(1024), Some(2048));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filter_by_size(results, None, None).len(), 2);
    }

    #[test]
    fn test_filter_by_date_range_open_bounds() {
        let results = vec![sized("a", 1, 10), sized("b", 1, 20), sized("c", 1, 30)];
        assert_eq!(ids(&filter_by_date_range(results.clone(), Some(20), None)), vec!["b", "c"]);
        assert_eq!(ids(&filter_by_date_range(results, None, Some(20))), vec!["a", "b"]);
    }

    #[test]
    fn test_get_file_path() {
        let folders = snapshot().folders;
        assert_eq!(get_file_path(Some("root"), &folders), "/");
        assert_eq!(get_file_path(None, &folders), "/");
        assert_eq!(get_file_path(Some("q3"), &folders), "/Finance/Q3");
        assert_eq!(get_file_path(Some("missing"), &folders), "/");

        let mut broken = folders.clone();
        broken.remove("finance");
        assert_eq!(get_file_path(Some("q3"), &broken), "/Q3");
    }

    #[tokio::test]
    async fn test_search_over_store_snapshot() {
        let store = DataRoomStore::open(Arc::new(MemoryBackend::new()), StoreLimits::default())
            .await
            .unwrap();
        let room = store.create_data_room("Deal").await.unwrap();
        let legal = store.create_folder(&room.root_folder_id, "Legal").await.unwrap();
        store
            .upload_file(
                &legal.id,
                "nda.pdf",
                Bytes::from_static(b"mutual non-disclosure agreement"),
                "application/pdf",
            )
            .await
            .unwrap();

        let snapshot = store.room_snapshot(&room.id).unwrap();
        let results = engine()
            .perform_search(&SearchFilters::new("Disclosure"), &snapshot)
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Content);
        assert_eq!(results[0].parent_folder_path, "/Legal");
        assert_eq!(
            results[0].matched_text.as_deref(),
            Some("...mutual non-disclosure agreement...")
        );
    }
}
