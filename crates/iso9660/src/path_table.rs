//! Path table construction and both-endian encoding (spec.md §4.3).

use std::collections::{HashMap, VecDeque};

use crate::tree::Tree;
use crate::types::EndianType;

#[derive(Debug, Clone)]
pub struct PathTableRecord {
    pub directory_identifier: Vec<u8>,
    pub extent_location: u32,
    pub parent_directory_number: u32,
    /// 1-based position of this record's own arena node, for lookups during layout.
    pub node_index: usize,
}

impl PathTableRecord {
    fn len_di(&self) -> u8 {
        self.directory_identifier.len() as u8
    }

    /// Encoded byte size of this record, including the odd-length pad byte.
    pub fn encoded_len(&self) -> u32 {
        8 + self.len_di() as u32 + (self.len_di() as u32 % 2)
    }

    pub fn encode(&self, endian: EndianType) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len() as usize);
        bytes.push(self.len_di());
        bytes.push(0); // extended attribute record length
        bytes.extend_from_slice(&endian.u32_bytes(self.extent_location));
        bytes.extend_from_slice(&endian.u16_bytes(self.parent_directory_number as u16));
        bytes.extend_from_slice(&self.directory_identifier);
        if self.len_di() % 2 == 1 {
            bytes.push(0);
        }
        bytes
    }
}

/// Builds the full path table record list for `tree` in ECMA-119 order:
/// the root first (self-parented), then every directory in breadth-first,
/// per-parent-sorted order. Extent locations are whatever `tree` currently
/// carries (callers fill these in once the layout engine has run).
pub fn build_path_table(tree: &Tree) -> Vec<PathTableRecord> {
    let mut records = Vec::new();
    let mut position_of: HashMap<usize, u32> = HashMap::new();

    records.push(PathTableRecord {
        directory_identifier: vec![0x00],
        extent_location: tree.node(Tree::ROOT).extent,
        parent_directory_number: 1,
        node_index: Tree::ROOT,
    });
    position_of.insert(Tree::ROOT, 1);

    let mut queue: VecDeque<usize> = tree.directory_children(Tree::ROOT).into_iter().collect();
    while let Some(idx) = queue.pop_front() {
        let parent = tree.node(idx).parent.expect("non-root node has a parent");
        let parent_pos = position_of[&parent];
        let pos = records.len() as u32 + 1;
        records.push(PathTableRecord {
            directory_identifier: tree.node(idx).name.clone(),
            extent_location: tree.node(idx).extent,
            parent_directory_number: parent_pos,
            node_index: idx,
        });
        position_of.insert(idx, pos);
        queue.extend(tree.directory_children(idx));
    }

    records
}

pub fn encoded_size(records: &[PathTableRecord]) -> u32 {
    records.iter().map(PathTableRecord::encoded_len).sum()
}

pub fn encode_table(records: &[PathTableRecord], endian: EndianType) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(encoded_size(records) as usize);
    for record in records {
        bytes.extend(record.encode(endian_copy(&endian)));
    }
    bytes
}

fn endian_copy(e: &EndianType) -> EndianType {
    match e {
        EndianType::NativeEndian => EndianType::NativeEndian,
        EndianType::LittleEndian => EndianType::LittleEndian,
        EndianType::BigEndian => EndianType::BigEndian,
    }
}

/// Parses a raw path table, as read from an existing image (spec.md §4.5).
pub fn parse_table(bytes: &[u8], endian: EndianType) -> Vec<PathTableRecord> {
    let mut records = Vec::new();
    let mut idx = 0;
    while idx + 8 <= bytes.len() {
        let len_di = bytes[idx] as usize;
        if len_di == 0 {
            break;
        }
        let extent_location = endian.read_u32([
            bytes[idx + 2],
            bytes[idx + 3],
            bytes[idx + 4],
            bytes[idx + 5],
        ]);
        let parent_directory_number =
            endian.read_u16([bytes[idx + 6], bytes[idx + 7]]) as u32;
        let name_start = idx + 8;
        let directory_identifier = bytes[name_start..name_start + len_di].to_vec();
        let mut record_len = 8 + len_di;
        if len_di % 2 == 1 {
            record_len += 1;
        }
        records.push(PathTableRecord {
            directory_identifier,
            extent_location,
            parent_directory_number,
            node_index: 0,
        });
        idx += record_len;
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_only_table_matches_ground_truth_size() {
        let tree = Tree::new();
        let records = build_path_table(&tree);
        assert_eq!(records.len(), 1);
        assert_eq!(encoded_size(&records), 10);
    }

    #[test]
    fn one_directory_table_matches_ground_truth_size() {
        let mut tree = Tree::new();
        tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()).unwrap();
        let records = build_path_table(&tree);
        assert_eq!(encoded_size(&records), 22);
    }

    #[test]
    fn two_level_deep_table_matches_ground_truth_size() {
        let mut tree = Tree::new();
        let dir1 = tree.insert_directory(Tree::ROOT, b"DIR1".to_vec()).unwrap();
        tree.insert_directory(dir1, b"SUBDIR1".to_vec()).unwrap();
        let records = build_path_table(&tree);
        assert_eq!(encoded_size(&records), 38);
    }
}
