//! Extent assignment (spec.md §4.4).
//!
//! Layout runs in a single pass: directory and path table *sizes* depend
//! only on identifier lengths and child counts, never on the extent values
//! those records end up carrying, so every zone's length is known before any
//! extent is handed out. A second, cheap pass then patches the extent values
//! recorded inside path table entries once every zone has a home.

use std::collections::HashMap;

use crate::directory::record_len;
use crate::path_table::{self, PathTableRecord};
use crate::tree::Tree;

pub const BLOCK_SIZE: u32 = 2048;

fn ceil_blocks(bytes: u32) -> u32 {
    bytes.div_ceil(BLOCK_SIZE)
}

/// Packs a directory's record lengths into 2048-byte blocks: a record is
/// never split across a block boundary (spec.md §3.7). Returns the byte
/// offset (from the start of the directory's data) of each record in turn.
pub fn pack_directory_offsets(record_lens: &[u32]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(record_lens.len());
    let mut block = 0u32;
    let mut offset_in_block = 0u32;
    for &len in record_lens {
        if offset_in_block + len > BLOCK_SIZE {
            block += 1;
            offset_in_block = 0;
        }
        offsets.push(block * BLOCK_SIZE + offset_in_block);
        offset_in_block += len;
    }
    offsets
}

pub fn directory_block_count(record_lens: &[u32]) -> u32 {
    let offsets = pack_directory_offsets(record_lens);
    match (offsets.last(), record_lens.last()) {
        (Some(&offset), Some(&len)) => (offset + len).div_ceil(BLOCK_SIZE),
        _ => 0,
    }
}

fn directory_record_lens(tree: &Tree, idx: usize) -> Vec<u32> {
    let mut lens = vec![34u32, 34u32]; // dot, dotdot
    for &child in tree.children(idx) {
        lens.push(record_len(tree.node(child).name.len()) as u32);
    }
    lens
}

#[derive(Debug, Clone, Default)]
pub struct DirExtents(HashMap<usize, (u32, u32)>);

impl DirExtents {
    pub fn get(&self, idx: usize) -> (u32, u32) {
        self.0.get(&idx).copied().unwrap_or((0, 0))
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub pvd_path_table: Vec<PathTableRecord>,
    pub pvd_path_table_le: u32,
    pub pvd_path_table_be: u32,
    pub pvd_path_table_size: u32,
    pub joliet_path_table: Option<Vec<PathTableRecord>>,
    pub joliet_path_table_le: u32,
    pub joliet_path_table_be: u32,
    pub joliet_path_table_size: u32,
    pub pvd_dirs: DirExtents,
    pub joliet_dirs: DirExtents,
    pub content_extents: Vec<(u32, u32)>,
    pub boot_catalog_extent: Option<u32>,
    pub boot_catalog_size: u32,
    pub space_size: u32,
}

impl Layout {
    pub fn boot_catalog(&self) -> Option<(u32, u32)> {
        self.boot_catalog_extent.map(|e| (e, self.boot_catalog_size))
    }
}

pub struct LayoutInput<'a> {
    pub pvd_tree: &'a Tree,
    pub joliet_tree: Option<&'a Tree>,
    pub content_lens: &'a [u32],
    pub boot_catalog_blocks: Option<u32>,
}

/// Walks `tree` breadth-first from the root, assigning each directory a
/// contiguous run of blocks at `cursor`. Directories are laid out back to
/// back with no padding between them.
fn layout_directories(tree: &Tree, cursor: &mut u32) -> DirExtents {
    let mut extents = HashMap::new();
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(Tree::ROOT);
    while let Some(idx) = queue.pop_front() {
        let lens = directory_record_lens(tree, idx);
        let blocks = directory_block_count(&lens).max(1);
        extents.insert(idx, (*cursor, blocks * BLOCK_SIZE));
        *cursor += blocks;
        queue.extend(tree.directory_children(idx));
    }
    DirExtents(extents)
}

fn patch_path_table_extents(records: &mut [PathTableRecord], dirs: &DirExtents) {
    for record in records.iter_mut() {
        record.extent_location = dirs.get(record.node_index).0;
    }
}

pub fn compute(input: LayoutInput) -> Layout {
    let has_eltorito = input.boot_catalog_blocks.is_some();
    let has_joliet = input.joliet_tree.is_some();

    let mut cursor = 16u32;
    // 1. System area already skipped; now the descriptor chain: PVD, [boot
    //    record], [SVD], VDST.
    let descriptor_count = 2 + has_eltorito as u32 + has_joliet as u32;
    cursor += descriptor_count;
    cursor += 1; // gap after the descriptor chain

    // 2. PVD path tables.
    let mut pvd_path_table = path_table::build_path_table(input.pvd_tree);
    let pvd_path_table_size = path_table::encoded_size(&pvd_path_table);
    let pvd_path_table_le = cursor;
    cursor += ceil_blocks(pvd_path_table_size);
    cursor += 1; // gap after the LE copy
    let pvd_path_table_be = cursor;
    cursor += ceil_blocks(pvd_path_table_size);
    cursor += 1; // gap after the BE copy

    // 3. Joliet path tables, if present.
    let (joliet_path_table, joliet_path_table_le, joliet_path_table_be, joliet_path_table_size) =
        if let Some(joliet_tree) = input.joliet_tree {
            let mut records = path_table::build_path_table(joliet_tree);
            let size = path_table::encoded_size(&records);
            let le = cursor;
            cursor += ceil_blocks(size);
            cursor += 1;
            let be = cursor;
            cursor += ceil_blocks(size);
            cursor += 1;
            (Some(std::mem::take(&mut records)), le, be, size)
        } else {
            (None, 0, 0, 0)
        };

    // 4. Directory trees: PVD first, then Joliet, contiguous.
    let pvd_dirs = layout_directories(input.pvd_tree, &mut cursor);
    let joliet_dirs = if let Some(joliet_tree) = input.joliet_tree {
        layout_directories(joliet_tree, &mut cursor)
    } else {
        DirExtents::default()
    };

    // 5. El Torito boot catalog.
    let mut boot_catalog_size = 0u32;
    let boot_catalog_extent = input.boot_catalog_blocks.map(|blocks| {
        let blocks = blocks.max(1);
        let extent = cursor;
        cursor += blocks;
        boot_catalog_size = blocks * BLOCK_SIZE;
        extent
    });

    // 6. File content, in declaration order.
    let content_extents: Vec<(u32, u32)> = input
        .content_lens
        .iter()
        .map(|&len| {
            let extent = cursor;
            cursor += ceil_blocks(len);
            (extent, len)
        })
        .collect();

    let space_size = cursor;

    let mut pvd_path_table = pvd_path_table;
    patch_path_table_extents(&mut pvd_path_table, &pvd_dirs);
    let mut joliet_path_table = joliet_path_table;
    if let Some(records) = joliet_path_table.as_mut() {
        patch_path_table_extents(records, &joliet_dirs);
    }

    Layout {
        pvd_path_table,
        pvd_path_table_le,
        pvd_path_table_be,
        pvd_path_table_size,
        joliet_path_table,
        joliet_path_table_le,
        joliet_path_table_be,
        joliet_path_table_size,
        pvd_dirs,
        joliet_dirs,
        content_extents,
        boot_catalog_extent,
        boot_catalog_size,
        space_size,
    }
}

/// Writes every node's computed extent/data_length back into `tree`, so the
/// tree and the writer agree on where everything lives.
pub fn apply_extents(
    tree: &mut Tree,
    dirs: &DirExtents,
    content_extents: &[(u32, u32)],
    boot_catalog: Option<(u32, u32)>,
) {
    for idx in 0..tree.len() {
        let node = tree.node(idx);
        let (extent, data_length) = if node.is_directory() {
            dirs.get(idx)
        } else if node.is_boot_catalog() {
            boot_catalog.expect("boot catalog node present without a boot catalog extent")
        } else if let Some(content) = node.content_id() {
            content_extents[content]
        } else {
            continue;
        };
        let node = tree.node_mut(idx);
        node.extent = extent;
        node.data_length = data_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_of(tree: &Tree) -> Layout {
        compute(LayoutInput {
            pvd_tree: tree,
            joliet_tree: None,
            content_lens: &[],
            boot_catalog_blocks: None,
        })
    }

    #[test]
    fn empty_image_matches_ground_truth() {
        let tree = Tree::new();
        let layout = layout_of(&tree);
        assert_eq!(layout.pvd_path_table_size, 10);
        assert_eq!(layout.pvd_path_table_le, 19);
        assert_eq!(layout.pvd_path_table_be, 21);
        assert_eq!(layout.pvd_dirs.get(Tree::ROOT).0, 23);
        assert_eq!(layout.space_size, 24);
    }

    #[test]
    fn one_directory_matches_ground_truth() {
        let mut tree = Tree::new();
        tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()).unwrap();
        let layout = layout_of(&tree);
        assert_eq!(layout.pvd_path_table_size, 22);
        assert_eq!(layout.pvd_path_table_le, 19);
        assert_eq!(layout.pvd_path_table_be, 21);
        assert_eq!(layout.pvd_dirs.get(Tree::ROOT).0, 23);
    }

    #[test]
    fn two_level_deep_matches_ground_truth() {
        let mut tree = Tree::new();
        let dir1 = tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()).unwrap();
        tree.insert_directory(dir1, b"SUBDIR1".to_vec()).unwrap();
        let layout = layout_of(&tree);
        assert_eq!(layout.pvd_path_table_size, 38);
        assert_eq!(layout.pvd_path_table_be, 21);
    }
}
