//! Arena representation of the folder hierarchy.
//!
//! Folders travel over the wire and sit in storage as a nested tree, but every
//! mutation happens here: nodes are keyed by id and link to their parent and
//! children by id, so renaming or inserting a subfolder is a map update rather
//! than a rebuild of the path from the root.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{Folder, FolderId, FolderPatch};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct FolderNode {
    /// Folder fields; `subfolders` is always empty inside the arena.
    folder: Folder,
    parent: Option<FolderId>,
    children: Vec<FolderId>,
}

/// Folder hierarchy keyed by id with ordered roots and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTree {
    nodes: HashMap<FolderId, FolderNode>,
    roots: Vec<FolderId>,
}

impl FolderTree {
    /// Build an arena from the nested form, preserving sibling order.
    ///
    /// A folder id that appears twice keeps its first occurrence.
    #[must_use]
    pub fn from_nested(folders: Vec<Folder>) -> Self {
        let mut tree = Self::default();
        for folder in folders {
            tree.insert_subtree(folder, None);
        }
        tree
    }

    /// Render the arena back to the nested form.
    #[must_use]
    pub fn to_nested(&self) -> Vec<Folder> {
        self.roots.iter().filter_map(|id| self.build(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: FolderId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Folder fields for `id`, without subfolders.
    pub fn get(&self, id: FolderId) -> Option<&Folder> {
        self.nodes.get(&id).map(|node| &node.folder)
    }

    pub fn roots(&self) -> &[FolderId] {
        &self.roots
    }

    pub fn children(&self, id: FolderId) -> &[FolderId] {
        self.nodes
            .get(&id)
            .map_or(&[] as &[FolderId], |node| node.children.as_slice())
    }

    pub fn parent(&self, id: FolderId) -> Option<FolderId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Folder with its current subtree in nested form.
    pub fn subtree(&self, id: FolderId) -> Option<Folder> {
        self.build(id)
    }

    /// Insert a folder (and any subfolders it carries).
    ///
    /// It is attached under `parent_id` when that folder exists, otherwise at
    /// the root level. Inserting an id that already exists is rejected.
    pub fn insert(&mut self, folder: Folder) -> Result<()> {
        if self.nodes.contains_key(&folder.id) {
            return Err(Error::InvalidInput(format!(
                "folder {} already exists",
                folder.id
            )));
        }
        let parent = folder.parent_id.filter(|id| self.nodes.contains_key(id));
        self.insert_subtree(folder, parent);
        Ok(())
    }

    /// Insert or replace a folder with an authoritative version.
    ///
    /// Existing local children are kept; subfolders carried by `folder` are
    /// upserted beneath it. The folder is re-attached when its declared parent
    /// changed and the move is valid.
    pub fn upsert(&mut self, mut folder: Folder) {
        let subfolders = std::mem::take(&mut folder.subfolders);
        let id = folder.id;

        if let Some(node) = self.nodes.get_mut(&id) {
            let declared_parent = folder.parent_id;
            node.folder = folder;
            let current_parent = node.parent;
            if declared_parent != current_parent {
                match declared_parent.filter(|p| self.nodes.contains_key(p)) {
                    Some(parent) if !self.is_descendant_or_self(parent, id) => {
                        self.detach(id);
                        self.attach(id, Some(parent));
                    }
                    Some(_) => {}
                    None if declared_parent.is_none() => {
                        self.detach(id);
                        self.attach(id, None);
                    }
                    None => {}
                }
            }
        } else {
            let parent = folder.parent_id.filter(|p| self.nodes.contains_key(p));
            self.nodes.insert(
                id,
                FolderNode {
                    folder,
                    parent: None,
                    children: Vec::new(),
                },
            );
            self.attach(id, parent);
        }

        for mut child in subfolders {
            child.parent_id = Some(id);
            self.upsert(child);
        }
    }

    /// Apply a patch to a folder and return its updated fields.
    ///
    /// Moving a folder beneath itself or one of its descendants is rejected.
    pub fn patch(&mut self, id: FolderId, patch: &FolderPatch, now: DateTime<Utc>) -> Result<Folder> {
        if !self.nodes.contains_key(&id) {
            return Err(Error::NotFound(format!("folder {id}")));
        }

        if let Some(new_parent) = patch.parent_id {
            if new_parent.is_some_and(|parent| self.is_descendant_or_self(parent, id)) {
                return Err(Error::InvalidInput(format!(
                    "folder {id} cannot be moved into its own subtree"
                )));
            }
            if self.parent(id) != new_parent {
                self.detach(id);
                let target = new_parent.filter(|parent| self.nodes.contains_key(parent));
                self.attach(id, target);
            }
        }

        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("folder {id}")))?;
        node.folder.apply_patch(patch, now);
        Ok(node.folder.clone())
    }

    /// Remove a folder and its whole subtree. Returns the removed ids,
    /// the folder itself first. Unknown ids remove nothing.
    pub fn remove(&mut self, id: FolderId) -> Vec<FolderId> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        self.detach(id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                removed.push(current);
                stack.extend(node.children.into_iter().rev());
            }
        }
        removed
    }

    /// Re-key a folder, e.g. from a provisional id to the canonical one.
    ///
    /// Children's `parent_id` and the parent's child list follow the new id.
    /// Returns `false` when `old` is unknown or `new` is already taken.
    pub fn rename_id(&mut self, old: FolderId, new: FolderId) -> bool {
        if old == new {
            return self.nodes.contains_key(&old);
        }
        if self.nodes.contains_key(&new) {
            return false;
        }
        let Some(mut node) = self.nodes.remove(&old) else {
            return false;
        };

        node.folder.id = new;
        for child in &node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = Some(new);
                child_node.folder.parent_id = Some(new);
            }
        }

        let siblings = match node.parent {
            Some(parent) => self.nodes.get_mut(&parent).map(|p| &mut p.children),
            None => Some(&mut self.roots),
        };
        if let Some(siblings) = siblings {
            for sibling in siblings.iter_mut() {
                if *sibling == old {
                    *sibling = new;
                }
            }
        }

        self.nodes.insert(new, node);
        true
    }

    /// All folder ids, parents before children, siblings in order.
    pub fn ids(&self) -> Vec<FolderId> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<FolderId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            ordered.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        ordered
    }

    fn is_descendant_or_self(&self, candidate: FolderId, ancestor: FolderId) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn insert_subtree(&mut self, mut folder: Folder, parent: Option<FolderId>) {
        if self.nodes.contains_key(&folder.id) {
            tracing::warn!("Ignoring duplicate folder id {} in folder tree", folder.id);
            return;
        }
        let id = folder.id;
        let subfolders = std::mem::take(&mut folder.subfolders);
        self.nodes.insert(
            id,
            FolderNode {
                folder,
                parent: None,
                children: Vec::new(),
            },
        );
        self.attach(id, parent);
        for child in subfolders {
            self.insert_subtree(child, Some(id));
        }
    }

    fn attach(&mut self, id: FolderId, parent: Option<FolderId>) {
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
            if parent.is_some() {
                node.folder.parent_id = parent;
            }
        }
    }

    fn detach(&mut self, id: FolderId) {
        let parent = self.nodes.get(&id).and_then(|node| node.parent);
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }

    fn build(&self, id: FolderId) -> Option<Folder> {
        let node = self.nodes.get(&id)?;
        let mut folder = node.folder.clone();
        folder.subfolders = node
            .children
            .iter()
            .filter_map(|child| self.build(*child))
            .collect();
        Some(folder)
    }
}
