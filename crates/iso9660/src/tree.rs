//! Arena-based in-memory directory tree (spec.md §9 Design Notes).
//!
//! Parents are expressed as arena indices rather than owning references, and
//! dot/dotdot are never stored as nodes: they are synthesized by the writer
//! and materialized by the parser only in the view handed back to callers.

use crate::error::IsoError;

pub type ContentId = usize;

/// Unassigned extent sentinel. Real extents always point past the 16-block
/// system area, so 0 is never a valid assigned value.
pub const UNASSIGNED_EXTENT: u32 = 0;

#[derive(Debug, Clone)]
pub enum NodeKind {
    Directory { children: Vec<usize> },
    File { content: ContentId },
    /// The El Torito boot catalog, represented as an ordinary directory
    /// entry whose bytes are generated by the writer rather than drawn from
    /// the `ContentTable` (spec.md §4.4 step 7).
    BootCatalog,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: Vec<u8>,
    pub parent: Option<usize>,
    pub kind: NodeKind,
    pub extent: u32,
    pub data_length: u32,
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_boot_catalog(&self) -> bool {
        matches!(self.kind, NodeKind::BootCatalog)
    }

    pub fn content_id(&self) -> Option<ContentId> {
        match self.kind {
            NodeKind::File { content } => Some(content),
            _ => None,
        }
    }
}

/// An arena-backed directory tree. Index `0` is always the root directory.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: vec![0x00],
                parent: None,
                kind: NodeKind::Directory { children: Vec::new() },
                extent: UNASSIGNED_EXTENT,
                data_length: 0,
            }],
        }
    }

    pub const ROOT: usize = 0;

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn directory_children(&self, idx: usize) -> Vec<usize> {
        match &self.nodes[idx].kind {
            NodeKind::Directory { children } => children
                .iter()
                .copied()
                .filter(|&c| self.nodes[c].is_directory())
                .collect(),
            NodeKind::File { .. } | NodeKind::BootCatalog => Vec::new(),
        }
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        match &self.nodes[idx].kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } | NodeKind::BootCatalog => &[],
        }
    }

    /// Finds a direct child of `parent` by its already-mangled identifier bytes.
    pub fn find_child(&self, parent: usize, name: &[u8]) -> Option<usize> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name)
    }

    /// Inserts a new directory node under `parent`, keeping siblings ordered
    /// by ascending raw identifier bytes (spec.md §3 invariant 3).
    pub fn insert_directory(&mut self, parent: usize, name: Vec<u8>) -> Result<usize, IsoError> {
        self.insert_node(
            parent,
            name,
            NodeKind::Directory { children: Vec::new() },
        )
    }

    /// Inserts a new file node under `parent`, referencing `content` and
    /// recording its exact byte length in `data_length`.
    pub fn insert_file(
        &mut self,
        parent: usize,
        name: Vec<u8>,
        content: ContentId,
        data_length: u32,
    ) -> Result<usize, IsoError> {
        let idx = self.insert_node(parent, name, NodeKind::File { content })?;
        self.nodes[idx].data_length = data_length;
        Ok(idx)
    }

    /// Inserts the synthetic boot catalog entry under `parent`.
    pub fn insert_boot_catalog(&mut self, parent: usize, name: Vec<u8>) -> Result<usize, IsoError> {
        self.insert_node(parent, name, NodeKind::BootCatalog)
    }

    fn insert_node(
        &mut self,
        parent: usize,
        name: Vec<u8>,
        kind: NodeKind,
    ) -> Result<usize, IsoError> {
        if self.find_child(parent, &name).is_some() {
            return Err(IsoError::AlreadyExists(
                String::from_utf8_lossy(&name).into_owned(),
            ));
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            name: name.clone(),
            parent: Some(parent),
            kind,
            extent: UNASSIGNED_EXTENT,
            data_length: 0,
        });
        let siblings = match &self.nodes[parent].kind {
            NodeKind::Directory { children } => children.clone(),
            NodeKind::File { .. } | NodeKind::BootCatalog => {
                return Err(IsoError::NotADirectory(
                    String::from_utf8_lossy(&self.nodes[parent].name).into_owned(),
                ));
            }
        };
        let pos = siblings
            .partition_point(|&c| self.nodes[c].name.as_slice() < name.as_slice());
        self.nodes[parent]
            .children_mut()
            .insert(pos, idx);
        Ok(idx)
    }

    /// Walks `components` from the root, requiring every component to already
    /// exist and be a directory. Used to resolve the parent of a new entry.
    pub fn resolve_directory(&self, components: &[Vec<u8>]) -> Result<usize, IsoError> {
        let mut cur = Self::ROOT;
        for component in components {
            cur = self
                .find_child(cur, component)
                .filter(|&c| self.nodes[c].is_directory())
                .ok_or_else(|| {
                    IsoError::NotFound(String::from_utf8_lossy(component).into_owned())
                })?;
        }
        Ok(cur)
    }

    /// Walks `components` from the root, resolving the final component too
    /// (which may be a file or a directory).
    pub fn resolve(&self, components: &[Vec<u8>]) -> Result<usize, IsoError> {
        if components.is_empty() {
            return Ok(Self::ROOT);
        }
        let parent = self.resolve_directory(&components[..components.len() - 1])?;
        self.find_child(parent, components.last().unwrap())
            .ok_or_else(|| {
                IsoError::NotFound(String::from_utf8_lossy(components.last().unwrap()).into_owned())
            })
    }
}

impl Node {
    fn children_mut(&mut self) -> &mut Vec<usize> {
        match &mut self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } | NodeKind::BootCatalog => {
                unreachable!("children_mut called on a non-directory node")
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte content shared between the PVD and Joliet trees, keyed by `ContentId`.
#[derive(Debug, Clone, Default)]
pub struct ContentTable {
    entries: Vec<Vec<u8>>,
}

impl ContentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: Vec<u8>) -> ContentId {
        let id = self.entries.len();
        self.entries.push(bytes);
        id
    }

    pub fn get(&self, id: ContentId) -> &[u8] {
        &self.entries[id]
    }

    pub fn len_of(&self, id: ContentId) -> u32 {
        self.entries[id].len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContentId, &Vec<u8>)> {
        self.entries.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_are_kept_sorted_by_identifier() {
        let mut tree = Tree::new();
        tree.insert_directory(Tree::ROOT, b"DIR2".to_vec()).unwrap();
        tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()).unwrap();
        tree.insert_directory(Tree::ROOT, b"DIR10".to_vec()).unwrap();
        let children: Vec<_> = tree
            .children(Tree::ROOT)
            .iter()
            .map(|&c| tree.node(c).name.clone())
            .collect();
        assert_eq!(children, vec![b"DIR1".to_vec(), b"DIR10".to_vec(), b"DIR2".to_vec()]);
    }

    #[test]
    fn resolve_walks_nested_directories() {
        let mut tree = Tree::new();
        let dir1 = tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()).unwrap();
        tree.insert_directory(dir1, b"SUBDIR1".to_vec()).unwrap();
        let resolved = tree
            .resolve(&[b"DIR1".to_vec(), b"SUBDIR1".to_vec()])
            .unwrap();
        assert_eq!(tree.node(resolved).name, b"SUBDIR1");
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut tree = Tree::new();
        tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()).unwrap();
        assert!(matches!(
            tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()),
            Err(IsoError::AlreadyExists(_))
        ));
    }
}
