#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use sea_orm::prelude::*;
    use sea_orm::EntityTrait;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    use crate::config::StoreLimits;
    use crate::error::AppError;
    use crate::store::backend::StateBackend;
    use crate::store::entity;
    use crate::store::{
        DataRoomStore, MemoryBackend, SqliteBackend, TreeNode, HISTORY_KEY, ROOT_FOLDER_NAME,
        STATE_KEY,
    };

    async fn setup_memory_store() -> (Arc<MemoryBackend>, DataRoomStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = DataRoomStore::open(backend.clone(), StoreLimits::default())
            .await
            .expect("Failed to open store");
        (backend, store)
    }

    async fn setup_sqlite_backend(db_file: &NamedTempFile) -> SqliteBackend {
        let db_url = format!("sqlite:{}?mode=rwc", db_file.path().display());
        SqliteBackend::connect(&db_url, None)
            .await
            .expect("Failed to connect backend")
    }

    fn pdf(data: &'static [u8]) -> Bytes {
        Bytes::from_static(data)
    }

    #[tokio::test]
    async fn test_db_init() {
        let db_file = NamedTempFile::new().unwrap();
        let backend = setup_sqlite_backend(&db_file).await;
        let count = entity::Entity::find()
            .count(&backend.db)
            .await
            .expect("Failed to query DB");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_sqlite_backend_roundtrip_and_quota() {
        let db_file = NamedTempFile::new().unwrap();
        let db_url = format!("sqlite:{}?mode=rwc", db_file.path().display());
        let backend = SqliteBackend::connect(&db_url, Some(16)).await.unwrap();

        backend.save("a", "0123456789".to_string()).await.unwrap();
        backend.save("a", "012345".to_string()).await.unwrap();
        assert_eq!(backend.load("a").await.unwrap().as_deref(), Some("012345"));

        let err = backend.save("b", "0123456789ab".to_string()).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(backend.load("b").await.unwrap().is_none());

        backend.remove("a").await.unwrap();
        assert!(backend.load("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_data_room_has_empty_root() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();

        let root = store.get_folder(&room.root_folder_id).unwrap();
        assert_eq!(root.name, ROOT_FOLDER_NAME);
        assert!(root.is_root());
        assert!(root.children.is_empty());
        assert_eq!(store.folder_depth(&root.id), Some(0));
        assert_eq!(store.get_all_data_rooms(), vec![room.clone()]);
        assert_eq!(store.get_data_room(&room.id), Some(room));
    }

    #[tokio::test]
    async fn test_folder_name_suffix_sequence() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();

        let mut names = Vec::new();
        for _ in 0..4 {
            let folder = store
                .create_folder(&room.root_folder_id, "Legal")
                .await
                .unwrap();
            names.push(folder.name);
        }
        assert_eq!(
            names,
            vec!["Legal", "Legal (new)", "Legal (new 1)", "Legal (new 2)"]
        );

        // Case-sensitive: a differently-cased name does not collide.
        let other = store
            .create_folder(&room.root_folder_id, "legal")
            .await
            .unwrap();
        assert_eq!(other.name, "legal");
    }

    #[tokio::test]
    async fn test_file_names_do_not_collide_with_folders() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        store
            .upload_file(&room.root_folder_id, "Legal", pdf(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        let folder = store
            .create_folder(&room.root_folder_id, "Legal")
            .await
            .unwrap();
        assert_eq!(folder.name, "Legal");
    }

    #[tokio::test]
    async fn test_depth_limit_on_create() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();

        let mut parent = room.root_folder_id.clone();
        for level in 1..=5 {
            let folder = store.create_folder(&parent, "level").await.unwrap();
            assert_eq!(store.folder_depth(&folder.id), Some(level));
            parent = folder.id;
        }

        let err = store.create_folder(&parent, "too deep").await.unwrap_err();
        assert!(matches!(err, AppError::DepthLimitExceeded(_)));
        assert_eq!(store.get_folder(&parent).unwrap().children.len(), 0);
        assert_eq!(store.subtree_height(&room.root_folder_id), Some(5));
    }

    #[tokio::test]
    async fn test_depth_limit_is_configurable() {
        let backend = Arc::new(MemoryBackend::new());
        let store = DataRoomStore::open(backend, StoreLimits { max_folder_depth: 1 })
            .await
            .unwrap();
        let room = store.create_data_room("Deal").await.unwrap();

        let first = store.create_folder(&room.root_folder_id, "a").await.unwrap();
        assert!(store.create_folder(&first.id, "b").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_folder_recursive() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let legal = store.create_folder(&room.root_folder_id, "Legal").await.unwrap();
        let contracts = store.create_folder(&legal.id, "Contracts").await.unwrap();
        let nda = store
            .upload_file(&contracts.id, "nda.pdf", pdf(b"%PDF nda"), "application/pdf")
            .await
            .unwrap();
        let memo = store
            .upload_file(&legal.id, "memo.pdf", pdf(b"%PDF memo"), "application/pdf")
            .await
            .unwrap();
        let kept = store
            .upload_file(&room.root_folder_id, "kept.pdf", pdf(b"%PDF kept"), "application/pdf")
            .await
            .unwrap();

        let deleted = store.delete_folder_recursive(&legal.id).await.unwrap().unwrap();
        assert_eq!(deleted.folders, 2);
        assert_eq!(deleted.files, 2);

        assert!(store.get_folder_structure(&legal.id).is_none());
        assert!(store.get_folder_structure(&contracts.id).is_none());
        assert!(store.get_file(nda.id()).is_none());
        assert!(store.get_file(memo.id()).is_none());
        assert!(store.get_file(kept.id()).is_some());

        let root = store.get_folder_structure(&room.root_folder_id).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].id(), kept.id());
    }

    #[tokio::test]
    async fn test_delete_data_room_cascades() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let other = store.create_data_room("Other").await.unwrap();
        let folder = store.create_folder(&room.root_folder_id, "Legal").await.unwrap();
        store
            .upload_file(&folder.id, "a.pdf", pdf(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        let deleted = store.delete_data_room(&room.id).await.unwrap();
        assert_eq!(deleted.map(|r| r.id), Some(room.id.clone()));
        assert!(store.get_data_room(&room.id).is_none());
        assert!(store.get_all_files().is_empty());
        assert_eq!(store.get_all_folders().len(), 1);
        assert_eq!(store.get_all_folders()[0].id, other.root_folder_id);
    }

    #[tokio::test]
    async fn test_missing_ids_are_silent_noops() {
        let (backend, store) = setup_memory_store().await;
        store.create_data_room("Deal").await.unwrap();
        let before = backend.load(STATE_KEY).await.unwrap();

        assert!(store.update_data_room_name("missing", "x").await.unwrap().is_none());
        assert!(store.delete_data_room("missing").await.unwrap().is_none());
        assert!(store.update_folder_name("missing", "x").await.unwrap().is_none());
        assert!(store.delete_folder_recursive("missing").await.unwrap().is_none());
        assert!(store.update_file_name("missing", "x").await.unwrap().is_none());
        assert!(store.delete_file("missing").await.unwrap().is_none());
        assert!(store.move_file("missing", "missing").await.unwrap().is_none());
        assert!(store.move_folder("missing", "other").await.unwrap().is_none());
        assert!(store.get_files_in_folder("missing").is_empty());

        assert_eq!(backend.load(STATE_KEY).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_orphan_folder_is_registered_but_unlinked() {
        let (_, store) = setup_memory_store().await;
        let orphan = store.create_folder("missing-parent", "Lost").await.unwrap();

        assert_eq!(store.get_folder(&orphan.id).unwrap().name, "Lost");
        assert_eq!(store.get_all_folders().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_persist_reload_is_byte_identical() {
        let (backend, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let file = store
            .upload_file(&room.root_folder_id, "blob.pdf", Bytes::from(data.clone()), "application/pdf")
            .await
            .unwrap();
        assert_eq!(file.record.size, 4096);

        let reopened = DataRoomStore::open(backend, StoreLimits::default())
            .await
            .unwrap();
        let loaded = reopened.get_file(file.id()).unwrap();
        assert_eq!(loaded.data.as_deref(), Some(data.as_slice()));
        assert_eq!(loaded.record, file.record);
        assert_eq!(
            reopened.get_folder_structure(&room.root_folder_id),
            store.get_folder_structure(&room.root_folder_id)
        );
    }

    #[tokio::test]
    async fn test_sqlite_persist_reload() {
        let db_file = NamedTempFile::new().unwrap();
        let file_id = {
            let backend = setup_sqlite_backend(&db_file).await;
            let store = DataRoomStore::open(Arc::new(backend), StoreLimits::default())
                .await
                .unwrap();
            let room = store.create_data_room("Deal").await.unwrap();
            store
                .upload_file(&room.root_folder_id, "a.pdf", pdf(b"%PDF-1.7"), "application/pdf")
                .await
                .unwrap()
                .record
                .id
        };

        let backend = setup_sqlite_backend(&db_file).await;
        let store = DataRoomStore::open(Arc::new(backend), StoreLimits::default())
            .await
            .unwrap();
        let file = store.get_file(&file_id).unwrap();
        assert_eq!(file.data.as_deref(), Some(&b"%PDF-1.7"[..]));
        assert_eq!(store.backend_type(), "sqlite");
    }

    #[tokio::test]
    async fn test_malformed_state_falls_back_to_empty() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_raw(STATE_KEY, "{not json");
        backend.insert_raw(HISTORY_KEY, "[1, 2");

        let store = DataRoomStore::open(backend, StoreLimits::default())
            .await
            .unwrap();
        assert!(store.get_all_data_rooms().is_empty());
        assert!(store.get_search_history().is_empty());
    }

    #[tokio::test]
    async fn test_bad_payload_encoding_falls_back_to_empty() {
        let backend = Arc::new(MemoryBackend::new());
        let blob = serde_json::json!({
            "dataRooms": [],
            "folders": [],
            "files": [["f1", {
                "id": "f1", "name": "a.pdf", "parentFolderId": null, "size": 1,
                "type": "application/pdf", "createdAt": 1, "updatedAt": 1,
                "data": "@@not base64@@"
            }]]
        });
        backend.insert_raw(STATE_KEY, &blob.to_string());

        let store = DataRoomStore::open(backend, StoreLimits::default())
            .await
            .unwrap();
        assert!(store.get_all_files().is_empty());
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_surfaced() {
        let backend = Arc::new(MemoryBackend::with_quota(2048));
        let store = DataRoomStore::open(backend.clone(), StoreLimits::default())
            .await
            .unwrap();
        let room = store.create_data_room("Deal").await.unwrap();
        let persisted = backend.used_bytes();

        let err = store
            .upload_file(&room.root_folder_id, "big.pdf", Bytes::from(vec![7u8; 4096]), "application/pdf")
            .await
            .unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(err.to_string(), crate::error::QUOTA_EXCEEDED_MESSAGE);
        // The backend still holds the last successful save.
        assert_eq!(backend.used_bytes(), persisted);
    }

    #[tokio::test]
    async fn test_move_file() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let source = store.create_folder(&room.root_folder_id, "Inbox").await.unwrap();
        let target = store.create_folder(&room.root_folder_id, "Archive").await.unwrap();
        let file = store
            .upload_file(&source.id, "a.pdf", pdf(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        let moved = store.move_file(file.id(), &target.id).await.unwrap().unwrap();
        assert_eq!(moved.parent_folder_id.as_deref(), Some(target.id.as_str()));
        assert_eq!(
            store.get_file(file.id()).unwrap().record.parent_folder_id,
            Some(target.id.clone())
        );
        assert!(store.get_files_in_folder(&source.id).is_empty());
        assert_eq!(store.get_files_in_folder(&target.id), vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn test_move_file_to_missing_folder_keeps_file_in_place() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let file = store
            .upload_file(&room.root_folder_id, "a.pdf", pdf(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        assert!(store.move_file(file.id(), "missing").await.unwrap().is_none());
        assert_eq!(store.get_files_in_folder(&room.root_folder_id), vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn test_move_folder_rejects_self_and_descendants() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let parent = store.create_folder(&room.root_folder_id, "Parent").await.unwrap();
        let child = store.create_folder(&parent.id, "Child").await.unwrap();
        let grandchild = store.create_folder(&child.id, "Grandchild").await.unwrap();

        let err = store.move_folder(&parent.id, &parent.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidMove(_)));
        let err = store.move_folder(&parent.id, &grandchild.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidMove(_)));
        let err = store
            .move_folder(&room.root_folder_id, &parent.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidMove(_)));

        assert_eq!(
            store.get_folder(&child.id).unwrap().parent_folder_id,
            Some(parent.id.clone())
        );
    }

    #[tokio::test]
    async fn test_move_folder_resolves_name_collision() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let a = store.create_folder(&room.root_folder_id, "A").await.unwrap();
        let b = store.create_folder(&room.root_folder_id, "B").await.unwrap();
        store.create_folder(&b.id, "Reports").await.unwrap();
        let reports = store.create_folder(&a.id, "Reports").await.unwrap();
        store.create_folder(&reports.id, "2024").await.unwrap();

        let moved = store.move_folder(&reports.id, &b.id).await.unwrap().unwrap();
        assert_eq!(moved.name, "Reports (new)");
        assert!(store.get_folder(&a.id).unwrap().children.is_empty());

        // Children travel with the folder.
        let tree = store.get_folder_structure(&b.id).unwrap();
        let names: Vec<&str> = tree.children.iter().map(TreeNode::name).collect();
        assert_eq!(names, vec!["Reports", "Reports (new)"]);
        match &tree.children[1] {
            TreeNode::Folder(folder) => assert_eq!(folder.children[0].name(), "2024"),
            TreeNode::File(_) => panic!("expected folder"),
        }

        // Moving within the same parent does not collide with itself.
        let same = store.move_folder(&reports.id, &b.id).await.unwrap().unwrap();
        assert_eq!(same.name, "Reports (new)");
    }

    #[tokio::test]
    async fn test_move_folder_respects_depth_limit() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let a = store.create_folder(&room.root_folder_id, "a").await.unwrap();
        let b = store.create_folder(&a.id, "b").await.unwrap();
        let c = store.create_folder(&b.id, "c").await.unwrap();
        let x = store.create_folder(&room.root_folder_id, "x").await.unwrap();
        let y = store.create_folder(&x.id, "y").await.unwrap();
        store.create_folder(&y.id, "z").await.unwrap();

        assert_eq!(store.subtree_height(&x.id), Some(2));
        let err = store.move_folder(&x.id, &c.id).await.unwrap_err();
        assert!(matches!(err, AppError::DepthLimitExceeded(_)));

        store.move_folder(&x.id, &a.id).await.unwrap().unwrap();
        assert_eq!(store.folder_depth(&y.id), Some(3));
    }

    #[tokio::test]
    async fn test_rename_folder_resolves_collision_with_siblings() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        store.create_folder(&room.root_folder_id, "Legal").await.unwrap();
        let finance = store.create_folder(&room.root_folder_id, "Finance").await.unwrap();

        let renamed = store.update_folder_name(&finance.id, "Legal").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Legal (new)");

        let unchanged = store
            .update_folder_name(&finance.id, "Legal (new)")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.name, "Legal (new)");
    }

    #[tokio::test]
    async fn test_rename_file_is_visible_in_tree() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let file = store
            .upload_file(&room.root_folder_id, "draft.pdf", pdf(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        store.update_file_name(file.id(), "final.pdf").await.unwrap();

        let tree = store.get_folder_structure(&room.root_folder_id).unwrap();
        assert_eq!(tree.children[0].name(), "final.pdf");
        assert_eq!(store.get_file(file.id()).unwrap().name(), "final.pdf");
    }

    #[tokio::test]
    async fn test_files_from_data_room_in_tree_order() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let other = store.create_data_room("Other").await.unwrap();
        store
            .upload_file(&room.root_folder_id, "1.pdf", pdf(b"1"), "application/pdf")
            .await
            .unwrap();
        let sub = store.create_folder(&room.root_folder_id, "Sub").await.unwrap();
        store
            .upload_file(&sub.id, "2.pdf", pdf(b"2"), "application/pdf")
            .await
            .unwrap();
        store
            .upload_file(&room.root_folder_id, "3.pdf", pdf(b"3"), "application/pdf")
            .await
            .unwrap();
        store
            .upload_file(&other.root_folder_id, "elsewhere.pdf", pdf(b"4"), "application/pdf")
            .await
            .unwrap();

        let names: Vec<String> = store
            .get_files_from_data_room(&room.id)
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["1.pdf", "2.pdf", "3.pdf"]);

        let snapshot = store.room_snapshot(&room.id).unwrap();
        assert_eq!(snapshot.files.len(), 3);
        assert_eq!(snapshot.folders.len(), 2);
        assert!(!snapshot.folders.contains_key(&other.root_folder_id));
    }

    #[tokio::test]
    async fn test_unique_file_name() {
        let (_, store) = setup_memory_store().await;
        let room = store.create_data_room("Deal").await.unwrap();
        let root = room.root_folder_id.clone();
        assert_eq!(store.unique_file_name(&root, "a.pdf"), "a.pdf");

        store.upload_file(&root, "a.pdf", pdf(b"1"), "application/pdf").await.unwrap();
        assert_eq!(store.unique_file_name(&root, "A.PDF"), "A.PDF (1)");

        store.upload_file(&root, "a.pdf (1)", pdf(b"2"), "application/pdf").await.unwrap();
        assert_eq!(store.unique_file_name(&root, "a.pdf"), "a.pdf (2)");
    }

    #[tokio::test]
    async fn test_search_history_persists() {
        let (backend, store) = setup_memory_store().await;
        store.save_search_term("budget").await.unwrap();
        store.save_search_term("report").await.unwrap();
        store.save_search_term("budget").await.unwrap();

        let reopened = DataRoomStore::open(backend.clone(), StoreLimits::default())
            .await
            .unwrap();
        assert_eq!(reopened.get_search_history(), vec!["budget", "report"]);

        reopened.clear_search_history().await.unwrap();
        assert!(reopened.get_search_history().is_empty());
        assert!(backend.load(HISTORY_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_history_unchanged_when_save_fails() {
        let backend = Arc::new(MemoryBackend::with_quota(64));
        let store = DataRoomStore::open(backend.clone(), StoreLimits::default())
            .await
            .unwrap();
        store.save_search_term("short").await.unwrap();

        let err = store.save_search_term(&"x".repeat(100)).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.get_search_history(), vec!["short"]);

        store.save_search_term("again").await.unwrap();
        assert_eq!(store.get_search_history(), vec!["again", "short"]);
        let reopened = DataRoomStore::open(backend, StoreLimits::default())
            .await
            .unwrap();
        assert_eq!(reopened.get_search_history(), vec!["again", "short"]);
    }
}
