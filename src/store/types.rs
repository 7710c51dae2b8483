//! Data room, folder and file records.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::codec;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Current time in milliseconds.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a fresh record id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A top-level workspace owning one folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRoom {
    pub id: String,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub root_folder_id: String,
}

/// Reference from a folder to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeRef {
    Folder { id: String },
    File { id: String },
}

impl NodeRef {
    pub fn id(&self) -> &str {
        match self {
            NodeRef::Folder { id } | NodeRef::File { id } => id,
        }
    }

    pub fn folder(id: impl Into<String>) -> Self {
        NodeRef::Folder { id: id.into() }
    }

    pub fn file(id: impl Into<String>) -> Self {
        NodeRef::File { id: id.into() }
    }
}

/// Canonical folder record. `children` is the authoritative adjacency list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    /// `None` only for data room roots.
    pub parent_folder_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub children: Vec<NodeRef>,
}

impl Folder {
    /// Check if this is a root folder.
    pub fn is_root(&self) -> bool {
        self.parent_folder_id.is_none()
    }

    /// Ids of the child folders, in order.
    pub fn child_folder_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|child| match child {
            NodeRef::Folder { id } => Some(id.as_str()),
            NodeRef::File { .. } => None,
        })
    }

    /// Ids of the child files, in order.
    pub fn child_file_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|child| match child {
            NodeRef::File { id } => Some(id.as_str()),
            NodeRef::Folder { .. } => None,
        })
    }
}

/// File summary without payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub parent_folder_id: Option<String>,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Full file: record plus binary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(flatten)]
    pub record: FileRecord,
    /// Persisted as base64 text.
    #[serde(default, with = "codec::payload")]
    pub data: Option<Bytes>,
}

impl FileContent {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Check if this file is a PDF by declared type or by name extension.
    pub fn is_pdf(&self) -> bool {
        self.record.mime_type == "application/pdf"
            || self.record.name.to_lowercase().ends_with(".pdf")
    }
}

/// Fully expanded folder, as rendered by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderTree {
    pub id: String,
    pub name: String,
    pub parent_folder_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub children: Vec<TreeNode>,
}

/// Child of an expanded folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TreeNode {
    Folder(FolderTree),
    File(FileRecord),
}

impl TreeNode {
    pub fn id(&self) -> &str {
        match self {
            TreeNode::Folder(folder) => &folder.id,
            TreeNode::File(file) => &file.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder(folder) => &folder.name,
            TreeNode::File(file) => &file.name,
        }
    }
}

/// One data room's tree, taken in a single consistent read.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub data_room: DataRoom,
    /// Files below the root, in tree order.
    pub files: Vec<FileContent>,
    /// Folders of this room only, keyed by id.
    pub folders: HashMap<String, Folder>,
}
