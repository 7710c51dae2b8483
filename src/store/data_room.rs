//! Persistent data room store.

use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::backend::StateBackend;
use super::codec::{decode_history, encode_history, PersistedState};
use super::history::SearchHistory;
use super::state::{DeletedSubtree, StoreState};
use super::types::{DataRoom, FileContent, FileRecord, Folder, FolderTree, RoomSnapshot};
use crate::config::StoreLimits;
use crate::error::Result;

/// Backend key of the serialized store.
pub const STATE_KEY: &str = "dataroom_store";
/// Backend key of the recent search terms.
pub const HISTORY_KEY: &str = "dataroom_search_history";

/// Whether an operation outcome changed the state and needs persisting.
trait Outcome {
    fn modified(&self) -> bool;
}

impl<T> Outcome for Option<T> {
    fn modified(&self) -> bool {
        self.is_some()
    }
}

impl Outcome for DataRoom {
    fn modified(&self) -> bool {
        true
    }
}

impl Outcome for Folder {
    fn modified(&self) -> bool {
        true
    }
}

impl Outcome for FileContent {
    fn modified(&self) -> bool {
        true
    }
}

/// Data rooms, folders and files with write-through persistence.
///
/// Every mutation is applied in memory, then the whole state is written to
/// the backend before the call returns. Mutations are serialized; reads never
/// wait on the backend.
pub struct DataRoomStore {
    state: RwLock<StoreState>,
    history: RwLock<SearchHistory>,
    /// Held across mutate + persist so saves land in mutation order.
    write_gate: Mutex<()>,
    backend: Arc<dyn StateBackend>,
    limits: StoreLimits,
}

impl DataRoomStore {
    /// Open the store, loading any state persisted in `backend`.
    ///
    /// A blob that fails to parse is logged and replaced by an empty state.
    pub async fn open(backend: Arc<dyn StateBackend>, limits: StoreLimits) -> Result<Self> {
        let state = match backend.load(STATE_KEY).await? {
            Some(text) => match PersistedState::decode(&text) {
                Ok(persisted) => {
                    let state = StoreState::from_persisted(persisted);
                    tracing::info!(
                        "Loaded {} data rooms, {} folders, {} files from {} backend",
                        state.data_rooms().len(),
                        state.folder_count(),
                        state.file_count(),
                        backend.backend_type()
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!("Failed to parse persisted store, starting empty: {}", e);
                    StoreState::default()
                }
            },
            None => StoreState::default(),
        };

        let history = match backend.load(HISTORY_KEY).await? {
            Some(text) => match decode_history(&text) {
                Ok(terms) => SearchHistory::from_terms(terms),
                Err(e) => {
                    tracing::warn!("Failed to parse search history, starting empty: {}", e);
                    SearchHistory::new()
                }
            },
            None => SearchHistory::new(),
        };

        Ok(Self {
            state: RwLock::new(state),
            history: RwLock::new(history),
            write_gate: Mutex::new(()),
            backend,
            limits,
        })
    }

    pub fn backend_type(&self) -> &'static str {
        self.backend.backend_type()
    }

    /// Apply `op` and persist the resulting state if it changed anything.
    ///
    /// A failed save leaves the in-memory change applied.
    async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        T: Outcome,
        F: FnOnce(&mut StoreState) -> Result<T>,
    {
        let _gate = self.write_gate.lock().await;

        let (outcome, blob) = {
            let mut state = self.state.write();
            let outcome = op(&mut state)?;
            if !outcome.modified() {
                return Ok(outcome);
            }
            let blob = state.to_persisted().encode()?;
            (outcome, blob)
        };

        self.backend.save(STATE_KEY, blob).await?;
        Ok(outcome)
    }

    // ========================================================================
    // Data Rooms
    // ========================================================================

    pub async fn create_data_room(&self, name: &str) -> Result<DataRoom> {
        let room = self.mutate(|state| Ok(state.create_data_room(name))).await?;
        tracing::info!("Created data room '{}' ({})", room.name, room.id);
        Ok(room)
    }

    pub fn get_data_room(&self, id: &str) -> Option<DataRoom> {
        self.state.read().data_room(id).cloned()
    }

    pub fn get_all_data_rooms(&self) -> Vec<DataRoom> {
        self.state.read().data_rooms().to_vec()
    }

    pub async fn update_data_room_name(&self, id: &str, name: &str) -> Result<Option<DataRoom>> {
        self.mutate(|state| Ok(state.rename_data_room(id, name))).await
    }

    /// Delete a data room and everything in its tree.
    pub async fn delete_data_room(&self, id: &str) -> Result<Option<DataRoom>> {
        let deleted = self.mutate(|state| Ok(state.delete_data_room(id))).await?;
        if let Some(room) = &deleted {
            tracing::info!("Deleted data room '{}' ({})", room.name, room.id);
        }
        Ok(deleted)
    }

    // ========================================================================
    // Folders
    // ========================================================================

    /// Create a folder, renaming it on collision with a sibling folder.
    pub async fn create_folder(&self, parent_folder_id: &str, name: &str) -> Result<Folder> {
        let limits = self.limits;
        self.mutate(|state| state.create_folder(parent_folder_id, name, &limits))
            .await
    }

    /// Shallow folder record with child references only.
    pub fn get_folder(&self, id: &str) -> Option<Folder> {
        self.state.read().folder(id).cloned()
    }

    pub async fn update_folder_name(&self, id: &str, name: &str) -> Result<Option<Folder>> {
        self.mutate(|state| Ok(state.rename_folder(id, name))).await
    }

    pub async fn delete_folder_recursive(&self, id: &str) -> Result<Option<DeletedSubtree>> {
        let deleted = self
            .mutate(|state| Ok(state.delete_folder_recursive(id)))
            .await?;
        if let Some(counts) = deleted {
            tracing::debug!(
                "Deleted folder {} with {} folders and {} files",
                id,
                counts.folders,
                counts.files
            );
        }
        Ok(deleted)
    }

    /// Move a folder under another folder.
    ///
    /// Fails with `InvalidMove` for itself, a descendant or a root folder, and
    /// with `DepthLimitExceeded` if the subtree would nest too deep.
    pub async fn move_folder(&self, folder_id: &str, new_parent_folder_id: &str) -> Result<Option<Folder>> {
        let limits = self.limits;
        self.mutate(|state| state.move_folder(folder_id, new_parent_folder_id, &limits))
            .await
    }

    pub fn get_folder_structure(&self, id: &str) -> Option<FolderTree> {
        self.state.read().folder_structure(id)
    }

    pub fn get_all_folders(&self) -> Vec<Folder> {
        self.state.read().all_folders()
    }

    pub fn folder_depth(&self, id: &str) -> Option<usize> {
        self.state.read().folder_depth(id)
    }

    pub fn subtree_height(&self, id: &str) -> Option<usize> {
        self.state.read().subtree_height(id)
    }

    // ========================================================================
    // Files
    // ========================================================================

    pub async fn upload_file(
        &self,
        parent_folder_id: &str,
        name: &str,
        data: Bytes,
        mime_type: &str,
    ) -> Result<FileContent> {
        let file = self
            .mutate(|state| Ok(state.upload_file(parent_folder_id, name, data, mime_type)))
            .await?;
        tracing::debug!("Stored file '{}' ({} bytes)", file.record.name, file.record.size);
        Ok(file)
    }

    pub fn get_file(&self, id: &str) -> Option<FileContent> {
        self.state.read().file(id).cloned()
    }

    pub async fn update_file_name(&self, id: &str, name: &str) -> Result<Option<FileRecord>> {
        self.mutate(|state| Ok(state.rename_file(id, name))).await
    }

    pub async fn delete_file(&self, id: &str) -> Result<Option<FileRecord>> {
        self.mutate(|state| Ok(state.delete_file(id))).await
    }

    pub fn get_files_in_folder(&self, folder_id: &str) -> Vec<String> {
        self.state.read().file_names_in_folder(folder_id)
    }

    pub fn unique_file_name(&self, folder_id: &str, name: &str) -> String {
        self.state.read().unique_file_name(folder_id, name)
    }

    pub async fn move_file(&self, file_id: &str, new_parent_folder_id: &str) -> Result<Option<FileRecord>> {
        self.mutate(|state| Ok(state.move_file(file_id, new_parent_folder_id)))
            .await
    }

    pub fn get_all_files(&self) -> Vec<FileContent> {
        self.state.read().all_files()
    }

    /// Every file in a data room's tree, with payloads.
    pub fn get_files_from_data_room(&self, data_room_id: &str) -> Vec<FileContent> {
        let state = self.state.read();
        state
            .data_room(data_room_id)
            .map(|room| state.files_in_subtree(&room.root_folder_id))
            .unwrap_or_default()
    }

    pub fn room_snapshot(&self, data_room_id: &str) -> Option<RoomSnapshot> {
        self.state.read().room_snapshot(data_room_id)
    }

    // ========================================================================
    // Search history
    // ========================================================================

    pub fn get_search_history(&self) -> Vec<String> {
        self.history.read().terms().to_vec()
    }

    /// Record a search term as the most recent one.
    ///
    /// The in-memory history only changes once the new list is persisted.
    pub async fn save_search_term(&self, term: &str) -> Result<()> {
        let _gate = self.write_gate.lock().await;

        let mut updated = self.history.read().clone();
        if !updated.record(term) {
            return Ok(());
        }
        let blob = encode_history(updated.terms())?;

        self.backend.save(HISTORY_KEY, blob).await?;
        *self.history.write() = updated;
        Ok(())
    }

    pub async fn clear_search_history(&self) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.history.write().clear();
        self.backend.remove(HISTORY_KEY).await
    }
}
