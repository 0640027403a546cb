//! Reconstructs an in-memory model from an existing image (spec.md §4.5).

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::volume::BootRecordVolumeDescriptor;
use crate::directory::DirectoryRecord;
use crate::error::IsoError;
use crate::layout::BLOCK_SIZE;
use crate::path_table::{self, PathTableRecord};
use crate::tree::{ContentId, ContentTable, Tree};
use crate::types::{Endian, EndianType};
use crate::volume::{PrimaryVolumeDescriptor, SupplementaryVolumeDescriptor, VolumeDescriptor, VolumeDescriptorList};

pub struct ParsedImage {
    pub primary: PrimaryVolumeDescriptor,
    pub supplementary: Option<SupplementaryVolumeDescriptor>,
    pub boot_record: Option<BootRecordVolumeDescriptor>,
    pub pvd_tree: Tree,
    pub joliet_tree: Option<Tree>,
    pub content: ContentTable,
    pub pvd_path_table: Vec<PathTableRecord>,
}

pub fn parse<R: Read + Seek>(src: &mut R) -> Result<ParsedImage, IsoError> {
    src.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    src.read_to_end(&mut buf)?;
    parse_bytes(&buf)
}

fn parse_bytes(buf: &[u8]) -> Result<ParsedImage, IsoError> {
    let block = BLOCK_SIZE as usize;
    if buf.len() < 17 * block {
        return Err(IsoError::TruncatedDescriptor);
    }

    let mut cursor = Cursor::new(&buf[16 * block..]);
    let list = VolumeDescriptorList::parse(&mut cursor)?;

    let primary = list
        .descriptors
        .iter()
        .find_map(|d| match d {
            VolumeDescriptor::Primary(p) => Some(*p),
            _ => None,
        })
        .ok_or(IsoError::BadMagic)?;
    let supplementary = list.descriptors.iter().find_map(|d| match d {
        VolumeDescriptor::Supplementary(s) => Some(*s),
        _ => None,
    });
    let boot_record = list.descriptors.iter().find_map(|d| match d {
        VolumeDescriptor::BootRecord(b) => Some(*b),
        _ => None,
    });

    primary.volume_space_size.try_read()?;
    primary.volume_set_size.try_read()?;
    primary.volume_sequence_number.try_read()?;
    primary.logical_block_size.try_read()?;
    primary.path_table_size.try_read()?;
    if let Some(svd) = &supplementary {
        svd.volume_space_size.try_read()?;
        svd.volume_set_size.try_read()?;
        svd.volume_sequence_number.try_read()?;
        svd.logical_block_size.try_read()?;
        svd.path_table_size.try_read()?;
    }

    let mut content = ContentTable::new();
    let mut extent_to_content: HashMap<u32, ContentId> = HashMap::new();

    let mut pvd_tree = Tree::new();
    {
        let root = pvd_tree.node_mut(Tree::ROOT);
        root.extent = primary.dir_record.header.extent.read();
        root.data_length = primary.dir_record.header.data_len.read();
    }
    let (root_extent, root_len) = {
        let root = pvd_tree.node(Tree::ROOT);
        (root.extent, root.data_length)
    };
    parse_directory_into(
        &mut pvd_tree,
        Tree::ROOT,
        buf,
        root_extent,
        root_len,
        &mut content,
        &mut extent_to_content,
    )?;

    let joliet_tree = match &supplementary {
        Some(svd) => {
            let mut tree = Tree::new();
            {
                let root = tree.node_mut(Tree::ROOT);
                root.extent = svd.dir_record.header.extent.read();
                root.data_length = svd.dir_record.header.data_len.read();
            }
            let (extent, len) = {
                let root = tree.node(Tree::ROOT);
                (root.extent, root.data_length)
            };
            parse_directory_into(&mut tree, Tree::ROOT, buf, extent, len, &mut content, &mut extent_to_content)?;
            Some(tree)
        }
        None => None,
    };

    let pvd_path_table = {
        let location = primary.type_l_path_table.get() as usize * block;
        let size = primary.path_table_size.read() as usize;
        let end = location + size;
        if end > buf.len() {
            return Err(IsoError::TruncatedDescriptor);
        }
        path_table::parse_table(&buf[location..end], EndianType::LittleEndian)
    };
    log::debug!(
        "parsed path table with {} records for a tree of {} directories",
        pvd_path_table.len(),
        count_directories(&pvd_tree)
    );

    Ok(ParsedImage {
        primary,
        supplementary,
        boot_record,
        pvd_tree,
        joliet_tree,
        content,
        pvd_path_table,
    })
}

fn count_directories(tree: &Tree) -> usize {
    let mut count = 0;
    let mut stack = vec![Tree::ROOT];
    while let Some(idx) = stack.pop() {
        count += 1;
        stack.extend(tree.directory_children(idx));
    }
    count
}

/// Walks one directory's extent, inserting every child record under
/// `parent_idx` and recursing into subdirectories.
fn parse_directory_into(
    tree: &mut Tree,
    parent_idx: usize,
    buf: &[u8],
    extent: u32,
    data_length: u32,
    content: &mut ContentTable,
    extent_to_content: &mut HashMap<u32, ContentId>,
) -> Result<(), IsoError> {
    let block = BLOCK_SIZE as usize;
    let start = extent as usize * block;
    let end = start
        .checked_add(data_length as usize)
        .ok_or(IsoError::TruncatedDescriptor)?;
    if end > buf.len() {
        return Err(IsoError::TruncatedDescriptor);
    }
    let data = &buf[start..end];

    let mut pos = 0usize;
    let mut seen = 0u32; // 0 = dot, 1 = dotdot, 2+ = real children
    while pos < data.len() {
        if data[pos] == 0 {
            let next_block = (pos / block + 1) * block;
            if next_block >= data.len() {
                break;
            }
            pos = next_block;
            continue;
        }

        let (record, len) = DirectoryRecord::parse(&data[pos..]);
        if len == 0 {
            return Err(IsoError::RecordCrossesBoundary);
        }
        if pos % block + len > block {
            return Err(IsoError::RecordCrossesBoundary);
        }
        pos += len;

        if seen < 2 {
            seen += 1;
            continue;
        }
        seen += 1;

        let name = record.name.bytes().to_vec();
        let rec_extent = record.header.extent.read();
        let rec_len = record.header.data_len.read();

        if record.header.is_directory() {
            let idx = tree.insert_directory(parent_idx, name)?;
            {
                let node = tree.node_mut(idx);
                node.extent = rec_extent;
                node.data_length = rec_len;
            }
            parse_directory_into(tree, idx, buf, rec_extent, rec_len, content, extent_to_content)?;
        } else {
            let content_id = *extent_to_content.entry(rec_extent).or_insert_with(|| {
                let file_start = rec_extent as usize * block;
                let file_end = (file_start + rec_len as usize).min(buf.len());
                let bytes = if file_start <= file_end {
                    buf[file_start..file_end].to_vec()
                } else {
                    Vec::new()
                };
                content.push(bytes)
            });
            let idx = tree.insert_file(parent_idx, name, content_id, rec_len)?;
            tree.node_mut(idx).extent = rec_extent;
        }
    }
    Ok(())
}
