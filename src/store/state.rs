//! In-memory arena of data rooms, folders and files.
//!
//! Folders reference their children by id; file records are never copied into
//! folders, so every read of a "lightweight" view is derived from the single
//! canonical record.

use bytes::Bytes;
use std::collections::{HashMap, HashSet};

use super::codec::PersistedState;
use super::types::{
    generate_id, now_millis, DataRoom, FileContent, FileRecord, Folder, FolderTree, NodeRef,
    RoomSnapshot, Timestamp, TreeNode,
};
use crate::config::StoreLimits;
use crate::error::{AppError, Result};

/// Name of every data room root folder; never shown in paths.
pub const ROOT_FOLDER_NAME: &str = "root";

/// Counts of records removed by a recursive delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct DeletedSubtree {
    pub folders: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    data_rooms: Vec<DataRoom>,
    folders: HashMap<String, Folder>,
    files: HashMap<String, FileContent>,
}

/// Pick `name`, or the first free `name (new)`, `name (new 1)`, `name (new 2)`, ...
pub fn unique_folder_name(name: &str, taken: &HashSet<&str>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    let mut candidate = format!("{} (new)", name);
    let mut counter = 1;
    while taken.contains(candidate.as_str()) {
        candidate = format!("{} (new {})", name, counter);
        counter += 1;
    }
    candidate
}

impl StoreState {
    pub fn from_persisted(persisted: PersistedState) -> Self {
        Self {
            data_rooms: persisted.data_rooms,
            folders: persisted.folders.into_iter().collect(),
            files: persisted.files.into_iter().collect(),
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            data_rooms: self.data_rooms.clone(),
            folders: self
                .all_folders()
                .into_iter()
                .map(|folder| (folder.id.clone(), folder))
                .collect(),
            files: self
                .all_files()
                .into_iter()
                .map(|file| (file.record.id.clone(), file))
                .collect(),
        }
    }

    // ========================================================================
    // Data Rooms
    // ========================================================================

    pub fn create_data_room(&mut self, name: &str) -> DataRoom {
        let now = now_millis();
        let root = Folder {
            id: generate_id(),
            name: ROOT_FOLDER_NAME.to_string(),
            parent_folder_id: None,
            created_at: now,
            updated_at: now,
            children: Vec::new(),
        };
        let data_room = DataRoom {
            id: generate_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            root_folder_id: root.id.clone(),
        };

        self.folders.insert(root.id.clone(), root);
        self.data_rooms.push(data_room.clone());
        data_room
    }

    pub fn data_room(&self, id: &str) -> Option<&DataRoom> {
        self.data_rooms.iter().find(|room| room.id == id)
    }

    pub fn data_rooms(&self) -> &[DataRoom] {
        &self.data_rooms
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Remove `child_id` from the children of `parent_id`, if both exist.
    fn detach_child(&mut self, parent_id: Option<&str>, child_id: &str, now: Timestamp) {
        let Some(parent_id) = parent_id else {
            return;
        };
        if let Some(parent) = self.folders.get_mut(parent_id) {
            parent.children.retain(|child| child.id() != child_id);
            parent.updated_at = now;
        }
    }

    pub fn rename_data_room(&mut self, id: &str, name: &str) -> Option<DataRoom> {
        let room = self.data_rooms.iter_mut().find(|room| room.id == id)?;
        room.name = name.to_string();
        room.updated_at = now_millis();
        Some(room.clone())
    }

    pub fn delete_data_room(&mut self, id: &str) -> Option<DataRoom> {
        let index = self.data_rooms.iter().position(|room| room.id == id)?;
        let root_folder_id = self.data_rooms[index].root_folder_id.clone();
        self.delete_folder_recursive(&root_folder_id);
        Some(self.data_rooms.remove(index))
    }

    // ========================================================================
    // Folders
    // ========================================================================

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.get(id)
    }

    /// Number of parent hops from `id` to its root.
    pub fn folder_depth(&self, id: &str) -> Option<usize> {
        let mut folder = self.folders.get(id)?;
        let mut depth = 0;
        while let Some(parent_id) = folder.parent_folder_id.as_deref() {
            match self.folders.get(parent_id) {
                Some(parent) if depth < self.folders.len() => {
                    depth += 1;
                    folder = parent;
                }
                _ => break,
            }
        }
        Some(depth)
    }

    /// Depth of the deepest descendant folder, relative to `id`.
    pub fn subtree_height(&self, id: &str) -> Option<usize> {
        let root = self.folders.get(id)?;
        let mut height = 0;
        let mut stack: Vec<(&Folder, usize)> = vec![(root, 0)];
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some((folder, level)) = stack.pop() {
            if !visited.insert(folder.id.as_str()) {
                continue;
            }
            height = height.max(level);
            for child_id in folder.child_folder_ids() {
                if let Some(child) = self.folders.get(child_id) {
                    stack.push((child, level + 1));
                }
            }
        }
        Some(height)
    }

    /// Check if `ancestor_id` lies on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor_id: &str, id: &str) -> bool {
        let mut current = self.folders.get(id).and_then(|f| f.parent_folder_id.as_deref());
        let mut hops = 0;
        while let Some(parent_id) = current {
            if parent_id == ancestor_id {
                return true;
            }
            hops += 1;
            if hops > self.folders.len() {
                break;
            }
            current = self.folders.get(parent_id).and_then(|f| f.parent_folder_id.as_deref());
        }
        false
    }

    fn sibling_folder_names<'a>(&'a self, parent: &'a Folder, exclude: Option<&str>) -> HashSet<&'a str> {
        parent
            .child_folder_ids()
            .filter(|id| Some(*id) != exclude)
            .filter_map(|id| self.folders.get(id))
            .map(|folder| folder.name.as_str())
            .collect()
    }

    pub fn create_folder(
        &mut self,
        parent_folder_id: &str,
        name: &str,
        limits: &StoreLimits,
    ) -> Result<Folder> {
        if let Some(depth) = self.folder_depth(parent_folder_id) {
            if depth >= limits.max_folder_depth {
                return Err(AppError::DepthLimitExceeded(format!(
                    "cannot create '{}' under a folder at depth {} (max {})",
                    name, depth, limits.max_folder_depth
                )));
            }
        }

        let unique_name = match self.folders.get(parent_folder_id) {
            Some(parent) => unique_folder_name(name, &self.sibling_folder_names(parent, None)),
            None => name.to_string(),
        };

        let now = now_millis();
        let folder = Folder {
            id: generate_id(),
            name: unique_name,
            parent_folder_id: Some(parent_folder_id.to_string()),
            created_at: now,
            updated_at: now,
            children: Vec::new(),
        };
        self.folders.insert(folder.id.clone(), folder.clone());

        match self.folders.get_mut(parent_folder_id) {
            Some(parent) => {
                parent.children.push(NodeRef::folder(folder.id.clone()));
                parent.updated_at = now;
            }
            None => {
                tracing::warn!(
                    "Parent folder {} not found, folder {} is not linked into any tree",
                    parent_folder_id,
                    folder.id
                );
            }
        }

        Ok(folder)
    }

    /// Rename a folder, resolving collisions with its sibling folders.
    pub fn rename_folder(&mut self, id: &str, name: &str) -> Option<Folder> {
        let folder = self.folders.get(id)?;
        let unique_name = match folder
            .parent_folder_id
            .as_deref()
            .and_then(|parent_id| self.folders.get(parent_id))
        {
            Some(parent) => unique_folder_name(name, &self.sibling_folder_names(parent, Some(id))),
            None => name.to_string(),
        };

        let folder = self.folders.get_mut(id)?;
        folder.name = unique_name;
        folder.updated_at = now_millis();
        Some(folder.clone())
    }

    /// Ids of `id` and every folder and file below it.
    fn collect_subtree(&self, id: &str) -> (Vec<String>, Vec<String>) {
        let mut folder_ids = Vec::new();
        let mut file_ids = Vec::new();
        let mut stack = vec![id.to_string()];
        let mut visited: HashSet<String> = HashSet::new();

        while let Some(folder_id) = stack.pop() {
            if !visited.insert(folder_id.clone()) {
                continue;
            }
            let Some(folder) = self.folders.get(&folder_id) else {
                continue;
            };
            for child in &folder.children {
                match child {
                    NodeRef::Folder { id } => stack.push(id.clone()),
                    NodeRef::File { id } => file_ids.push(id.clone()),
                }
            }
            folder_ids.push(folder_id);
        }

        (folder_ids, file_ids)
    }

    pub fn delete_folder_recursive(&mut self, id: &str) -> Option<DeletedSubtree> {
        let parent_id = self.folders.get(id)?.parent_folder_id.clone();

        let (folder_ids, file_ids) = self.collect_subtree(id);
        for file_id in &file_ids {
            self.files.remove(file_id);
        }
        for folder_id in &folder_ids {
            self.folders.remove(folder_id);
        }

        self.detach_child(parent_id.as_deref(), id, now_millis());

        Some(DeletedSubtree {
            folders: folder_ids.len(),
            files: file_ids.len(),
        })
    }

    pub fn move_folder(
        &mut self,
        folder_id: &str,
        new_parent_folder_id: &str,
        limits: &StoreLimits,
    ) -> Result<Option<Folder>> {
        let Some(folder) = self.folders.get(folder_id) else {
            return Ok(None);
        };
        if folder_id == new_parent_folder_id {
            return Err(AppError::InvalidMove(
                "cannot move a folder into itself".to_string(),
            ));
        }
        let Some(new_parent) = self.folders.get(new_parent_folder_id) else {
            return Ok(None);
        };
        if folder.is_root() {
            return Err(AppError::InvalidMove(
                "cannot move a data room root folder".to_string(),
            ));
        }
        if self.is_ancestor(folder_id, new_parent_folder_id) {
            return Err(AppError::InvalidMove(
                "cannot move a folder into one of its descendants".to_string(),
            ));
        }

        let target_depth = self.folder_depth(new_parent_folder_id).unwrap_or(0);
        let height = self.subtree_height(folder_id).unwrap_or(0);
        if target_depth + 1 + height > limits.max_folder_depth {
            return Err(AppError::DepthLimitExceeded(format!(
                "moving '{}' would nest folders {} levels deep (max {})",
                folder.name,
                target_depth + 1 + height,
                limits.max_folder_depth
            )));
        }

        let unique_name = unique_folder_name(
            &folder.name,
            &self.sibling_folder_names(new_parent, Some(folder_id)),
        );
        let old_parent_id = folder.parent_folder_id.clone();
        let now = now_millis();

        self.detach_child(old_parent_id.as_deref(), folder_id, now);

        let moved = match self.folders.get_mut(folder_id) {
            Some(folder) => {
                folder.parent_folder_id = Some(new_parent_folder_id.to_string());
                folder.name = unique_name;
                folder.updated_at = now;
                folder.clone()
            }
            None => return Ok(None),
        };

        if let Some(new_parent) = self.folders.get_mut(new_parent_folder_id) {
            new_parent.children.push(NodeRef::folder(folder_id));
            new_parent.updated_at = now;
        }

        Ok(Some(moved))
    }

    /// Expand `id` into a full tree of folders and lightweight file records.
    pub fn folder_structure(&self, id: &str) -> Option<FolderTree> {
        let folder = self.folders.get(id)?;
        Some(self.build_tree(folder, self.folders.len()))
    }

    fn build_tree(&self, folder: &Folder, budget: usize) -> FolderTree {
        let children = folder
            .children
            .iter()
            .filter_map(|child| match child {
                NodeRef::Folder { id } if budget > 0 => self
                    .folders
                    .get(id)
                    .map(|child| TreeNode::Folder(self.build_tree(child, budget - 1))),
                NodeRef::Folder { .. } => None,
                NodeRef::File { id } => self.files.get(id).map(|file| TreeNode::File(file.record.clone())),
            })
            .collect();

        FolderTree {
            id: folder.id.clone(),
            name: folder.name.clone(),
            parent_folder_id: folder.parent_folder_id.clone(),
            created_at: folder.created_at,
            updated_at: folder.updated_at,
            children,
        }
    }

    /// Every folder, ordered by creation time.
    pub fn all_folders(&self) -> Vec<Folder> {
        let mut folders: Vec<Folder> = self.folders.values().cloned().collect();
        folders.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        folders
    }

    // ========================================================================
    // Files
    // ========================================================================

    pub fn upload_file(
        &mut self,
        parent_folder_id: &str,
        name: &str,
        data: Bytes,
        mime_type: &str,
    ) -> FileContent {
        let now = now_millis();
        let file = FileContent {
            record: FileRecord {
                id: generate_id(),
                name: name.to_string(),
                parent_folder_id: Some(parent_folder_id.to_string()),
                size: data.len() as u64,
                mime_type: mime_type.to_string(),
                created_at: now,
                updated_at: now,
            },
            data: Some(data),
        };
        self.files.insert(file.record.id.clone(), file.clone());

        match self.folders.get_mut(parent_folder_id) {
            Some(parent) => {
                parent.children.push(NodeRef::file(file.record.id.clone()));
                parent.updated_at = now;
            }
            None => {
                tracing::warn!(
                    "Parent folder {} not found, file {} is not linked into any tree",
                    parent_folder_id,
                    file.record.id
                );
            }
        }

        file
    }

    pub fn file(&self, id: &str) -> Option<&FileContent> {
        self.files.get(id)
    }

    pub fn rename_file(&mut self, id: &str, name: &str) -> Option<FileRecord> {
        let file = self.files.get_mut(id)?;
        file.record.name = name.to_string();
        file.record.updated_at = now_millis();
        Some(file.record.clone())
    }

    pub fn delete_file(&mut self, id: &str) -> Option<FileRecord> {
        let file = self.files.remove(id)?;
        self.detach_child(file.record.parent_folder_id.as_deref(), id, now_millis());
        Some(file.record)
    }

    /// Names of the files directly inside `folder_id`.
    pub fn file_names_in_folder(&self, folder_id: &str) -> Vec<String> {
        self.folders
            .get(folder_id)
            .map(|folder| {
                folder
                    .child_file_ids()
                    .filter_map(|id| self.files.get(id))
                    .map(|file| file.record.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pick `name`, or the first free `name (1)`, `name (2)`, ... among the
    /// folder's files, compared case-insensitively.
    pub fn unique_file_name(&self, folder_id: &str, name: &str) -> String {
        let existing: HashSet<String> = self
            .file_names_in_folder(folder_id)
            .iter()
            .map(|n| n.to_lowercase())
            .collect();

        if !existing.contains(&name.to_lowercase()) {
            return name.to_string();
        }

        let mut counter = 1;
        loop {
            let candidate = format!("{} ({})", name, counter);
            if !existing.contains(&candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Move a file under another folder. Missing file or destination is a no-op.
    pub fn move_file(&mut self, file_id: &str, new_parent_folder_id: &str) -> Option<FileRecord> {
        if !self.folders.contains_key(new_parent_folder_id) {
            return None;
        }
        let old_parent_id = self.files.get(file_id)?.record.parent_folder_id.clone();
        let now = now_millis();

        self.detach_child(old_parent_id.as_deref(), file_id, now);

        let file = self.files.get_mut(file_id)?;
        file.record.parent_folder_id = Some(new_parent_folder_id.to_string());
        file.record.updated_at = now;
        let record = file.record.clone();

        if let Some(new_parent) = self.folders.get_mut(new_parent_folder_id) {
            new_parent.children.push(NodeRef::file(file_id));
            new_parent.updated_at = now;
        }

        Some(record)
    }

    /// Every file with payload, ordered by creation time.
    pub fn all_files(&self) -> Vec<FileContent> {
        let mut files: Vec<FileContent> = self.files.values().cloned().collect();
        files.sort_by(|a, b| {
            (a.record.created_at, &a.record.id).cmp(&(b.record.created_at, &b.record.id))
        });
        files
    }

    /// Every file below `root_folder_id`, in tree order.
    pub fn files_in_subtree(&self, root_folder_id: &str) -> Vec<FileContent> {
        let mut files = Vec::new();
        let mut visited = HashSet::new();
        if let Some(root) = self.folders.get(root_folder_id) {
            self.collect_files(root, &mut files, &mut visited);
        }
        files
    }

    fn collect_files<'a>(
        &'a self,
        folder: &'a Folder,
        out: &mut Vec<FileContent>,
        visited: &mut HashSet<&'a str>,
    ) {
        if !visited.insert(folder.id.as_str()) {
            return;
        }
        for child in &folder.children {
            match child {
                NodeRef::Folder { id } => {
                    if let Some(child_folder) = self.folders.get(id) {
                        self.collect_files(child_folder, out, visited);
                    }
                }
                NodeRef::File { id } => {
                    if let Some(file) = self.files.get(id) {
                        out.push(file.clone());
                    }
                }
            }
        }
    }

    /// Consistent view of one data room for searching.
    pub fn room_snapshot(&self, data_room_id: &str) -> Option<RoomSnapshot> {
        let data_room = self.data_room(data_room_id)?.clone();
        let (folder_ids, _) = self.collect_subtree(&data_room.root_folder_id);
        let folders = folder_ids
            .into_iter()
            .filter_map(|id| self.folders.get(&id).map(|folder| (id, folder.clone())))
            .collect();
        let files = self.files_in_subtree(&data_room.root_folder_id);

        Some(RoomSnapshot {
            data_room,
            files,
            folders,
        })
    }
}
