pub mod backend;
pub mod codec;
pub mod data_room;
pub mod entity;
pub mod history;
pub mod sqlite;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use backend::{MemoryBackend, StateBackend};
pub use data_room::{DataRoomStore, HISTORY_KEY, STATE_KEY};
pub use history::{SearchHistory, MAX_HISTORY_ENTRIES};
pub use sqlite::SqliteBackend;
pub use state::{unique_folder_name, DeletedSubtree, StoreState, ROOT_FOLDER_NAME};
pub use types::{
    DataRoom, FileContent, FileRecord, Folder, FolderTree, NodeRef, RoomSnapshot, Timestamp,
    TreeNode,
};
