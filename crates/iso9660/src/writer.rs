//! Encodes a laid-out model into its on-disk byte stream (spec.md §4.6).

use std::io::Write;

use crate::boot::{BootCatalogue, MediaType, PlatformId};
use crate::directory::{DirectoryRecord, FileFlags, RootDirectoryEntry};
use crate::error::IsoError;
use crate::layout::{pack_directory_offsets, Layout, BLOCK_SIZE};
use crate::path_table;
use crate::tree::{ContentTable, Tree};
use crate::types::{BigEndian, Endian, EndianType, IsoStrA, IsoStrD, LittleEndian, U32};
use crate::volume::{
    BootRecordVolumeDescriptor, PrimaryVolumeDescriptor, SupplementaryVolumeDescriptor,
    VolumeDescriptor, VolumeDescriptorHeader, VolumeDescriptorList, VolumeDescriptorType,
};

pub struct VolumeIdentity {
    pub sys_ident: String,
    pub vol_ident: String,
    pub set_ident: String,
    pub seq_num: u16,
    pub vol_set_size: u16,
    pub publisher_ident: String,
    pub preparer_ident: String,
    pub application_ident: String,
    pub copyright_ident: String,
    pub abstract_ident: String,
    pub bibliographic_ident: String,
    pub app_use: [u8; 512],
}

pub struct EltoritoWrite {
    pub platform_id: PlatformId,
    pub media_type: MediaType,
    pub load_segment: u16,
    pub boot_content_extent: u32,
    pub boot_content_len: u32,
}

fn write_at(buffer: &mut [u8], extent: u32, bytes: &[u8]) {
    let start = extent as usize * BLOCK_SIZE as usize;
    buffer[start..start + bytes.len()].copy_from_slice(bytes);
}

fn root_entry(extent: u32, data_length: u32) -> RootDirectoryEntry {
    let record = DirectoryRecord::directory(&[0x00], extent, data_length);
    RootDirectoryEntry {
        header: record.header,
        padding: 0,
    }
}

fn build_primary(identity: &VolumeIdentity, layout: &Layout, tree: &Tree) -> PrimaryVolumeDescriptor {
    let (root_extent, root_len) = (tree.node(Tree::ROOT).extent, tree.node(Tree::ROOT).data_length);
    let mut pvd = PrimaryVolumeDescriptor::new(layout.space_size);
    pvd.system_identifier = IsoStrA::from_str(&identity.sys_ident).unwrap_or(IsoStrA::empty());
    pvd.volume_identifier = IsoStrD::from_str(&identity.vol_ident).unwrap_or(IsoStrD::empty());
    pvd.volume_set_size.write(identity.vol_set_size);
    pvd.volume_sequence_number.write(identity.seq_num);
    pvd.path_table_size.write(layout.pvd_path_table_size);
    pvd.type_l_path_table = U32::<LittleEndian>::new(layout.pvd_path_table_le);
    pvd.type_m_path_table = U32::<BigEndian>::new(layout.pvd_path_table_be);
    pvd.dir_record = root_entry(root_extent, root_len);
    pvd.volume_set_identifier = IsoStrD::from_str(&identity.set_ident).unwrap_or(IsoStrD::empty());
    pvd.publisher_identifier = IsoStrA::from_str(&identity.publisher_ident).unwrap_or(IsoStrA::empty());
    pvd.preparer_identifier = IsoStrA::from_str(&identity.preparer_ident).unwrap_or(IsoStrA::empty());
    pvd.application_identifier =
        IsoStrA::from_str(&identity.application_ident).unwrap_or(IsoStrA::empty());
    pvd.copyright_file_identifier =
        IsoStrD::from_str(&identity.copyright_ident).unwrap_or(IsoStrD::empty());
    pvd.abstract_file_identifier =
        IsoStrD::from_str(&identity.abstract_ident).unwrap_or(IsoStrD::empty());
    pvd.bibliographic_file_identifier =
        IsoStrD::from_str(&identity.bibliographic_ident).unwrap_or(IsoStrD::empty());
    pvd.app_data = identity.app_use;
    pvd
}

fn build_supplementary(
    identity: &VolumeIdentity,
    layout: &Layout,
    tree: &Tree,
) -> Result<SupplementaryVolumeDescriptor, IsoError> {
    let (root_extent, root_len) = (tree.node(Tree::ROOT).extent, tree.node(Tree::ROOT).data_length);
    let mut svd = SupplementaryVolumeDescriptor::new(layout.space_size);
    pad_ucs2_into(&mut svd.system_identifier, &identity.sys_ident)?;
    pad_ucs2_into(&mut svd.volume_identifier, &identity.vol_ident)?;
    svd.volume_set_size.write(identity.vol_set_size);
    svd.volume_sequence_number.write(identity.seq_num);
    svd.path_table_size.write(layout.joliet_path_table_size);
    svd.type_l_path_table = U32::<LittleEndian>::new(layout.joliet_path_table_le);
    svd.type_m_path_table = U32::<BigEndian>::new(layout.joliet_path_table_be);
    svd.dir_record = root_entry(root_extent, root_len);
    pad_ucs2_into(&mut svd.volume_set_identifier, &identity.set_ident)?;
    pad_ucs2_into(&mut svd.publisher_identifier, &identity.publisher_ident)?;
    pad_ucs2_into(&mut svd.preparer_identifier, &identity.preparer_ident)?;
    pad_ucs2_into(&mut svd.application_identifier, &identity.application_ident)?;
    pad_ucs2_into(&mut svd.copyright_file_identifier, &identity.copyright_ident)?;
    pad_ucs2_into(&mut svd.abstract_file_identifier, &identity.abstract_ident)?;
    pad_ucs2_into(&mut svd.bibliographic_file_identifier, &identity.bibliographic_ident)?;
    svd.app_data = identity.app_use;
    Ok(svd)
}

/// Fills a Joliet identifier field with `s` encoded as UCS-2BE, space-padded
/// to the field's full width. Fields like `copyright_file_identifier` are 37
/// bytes wide (inherited from the PVD's d-character layout) and don't divide
/// evenly into 2-byte code units, so the trailing odd byte gets a bare space.
fn pad_ucs2_into(field: &mut [u8], s: &str) -> Result<(), IsoError> {
    let encoded = crate::types::ucs2::encode(s)?;
    let even_len = field.len() - field.len() % 2;
    let n = encoded.len().min(even_len);
    field[..n].copy_from_slice(&encoded[..n]);
    let mut i = n;
    while i + 1 < field.len() {
        field[i] = 0x00;
        field[i + 1] = 0x20;
        i += 2;
    }
    if i < field.len() {
        field[i] = 0x20;
    }
    Ok(())
}

fn build_boot_record(catalog_extent: u32) -> BootRecordVolumeDescriptor {
    let mut boot_system_identifier = [0u8; 32];
    let ident = b"EL TORITO SPECIFICATION";
    boot_system_identifier[..ident.len()].copy_from_slice(ident);
    BootRecordVolumeDescriptor {
        header: VolumeDescriptorHeader::new(VolumeDescriptorType::BootRecord),
        boot_system_identifier,
        unused0: [0; 32],
        catalog_ptr: U32::<LittleEndian>::new(catalog_extent),
        unused1: [0; 1973],
    }
}

/// Writes a whole directory's records (dot, dotdot, then every child in
/// on-disk order) into `buffer` at the directory's own extent.
fn write_directory(buffer: &mut [u8], tree: &Tree, idx: usize) {
    let node = tree.node(idx);
    let (self_extent, self_len) = (node.extent, node.data_length);
    let parent_idx = node.parent.unwrap_or(idx);
    let (parent_extent, parent_len) = {
        let parent = tree.node(parent_idx);
        (parent.extent, parent.data_length)
    };

    let mut records = vec![
        DirectoryRecord::directory(&[0x00], self_extent, self_len),
        DirectoryRecord::directory(&[0x01], parent_extent, parent_len),
    ];
    for &child in tree.children(idx) {
        let child_node = tree.node(child);
        let flags = if child_node.is_directory() {
            FileFlags::DIRECTORY
        } else {
            FileFlags::empty()
        };
        records.push(DirectoryRecord::new(
            &child_node.name,
            child_node.extent,
            child_node.data_length,
            flags,
        ));
    }

    let lens: Vec<u32> = records.iter().map(|r| r.size() as u32).collect();
    let offsets = pack_directory_offsets(&lens);
    for (record, offset) in records.iter().zip(offsets) {
        let start = (self_extent * BLOCK_SIZE + offset) as usize;
        let bytes = record.to_bytes();
        buffer[start..start + bytes.len()].copy_from_slice(&bytes);
    }
}

fn write_tree_directories(buffer: &mut [u8], tree: &Tree) {
    let mut stack = vec![Tree::ROOT];
    while let Some(idx) = stack.pop() {
        write_directory(buffer, tree, idx);
        stack.extend(tree.directory_children(idx));
    }
}

fn write_tree_content(buffer: &mut [u8], tree: &Tree, content: &ContentTable) {
    let mut stack = vec![Tree::ROOT];
    while let Some(idx) = stack.pop() {
        for &child in tree.children(idx) {
            let node = tree.node(child);
            if node.is_directory() {
                stack.push(child);
            } else if let Some(id) = node.content_id() {
                write_at(buffer, node.extent, content.get(id));
            }
        }
    }
}

/// Serializes the whole image described by `layout` into `sink`.
#[allow(clippy::too_many_arguments)]
pub fn write<W: Write>(
    sink: &mut W,
    identity: &VolumeIdentity,
    pvd_tree: &Tree,
    joliet_tree: Option<&Tree>,
    content: &ContentTable,
    layout: &Layout,
    eltorito: Option<&EltoritoWrite>,
) -> Result<(), IsoError> {
    let total_bytes = layout.space_size as usize * BLOCK_SIZE as usize;
    let mut buffer = vec![0u8; total_bytes];

    // 1. System area (blocks 0..15) is left zero; already satisfied by the
    //    zero-initialized buffer.

    // 2. Descriptor chain: PVD, [Boot Record], [SVD], VDST.
    let mut list = VolumeDescriptorList::empty();
    list.push(VolumeDescriptor::Primary(build_primary(identity, layout, pvd_tree)));
    if let Some(eltorito) = eltorito {
        let catalog_extent = layout.boot_catalog_extent.expect("eltorito implies a boot catalog extent");
        list.push(VolumeDescriptor::BootRecord(build_boot_record(catalog_extent)));
    }
    if let Some(joliet_tree) = joliet_tree {
        list.push(VolumeDescriptor::Supplementary(build_supplementary(
            identity, layout, joliet_tree,
        )?));
    }
    let mut descriptor_bytes = Vec::new();
    list.write(&mut descriptor_bytes)?;
    write_at(&mut buffer, 16, &descriptor_bytes);

    // 3. Path tables.
    write_at(
        &mut buffer,
        layout.pvd_path_table_le,
        &path_table::encode_table(&layout.pvd_path_table, EndianType::LittleEndian),
    );
    write_at(
        &mut buffer,
        layout.pvd_path_table_be,
        &path_table::encode_table(&layout.pvd_path_table, EndianType::BigEndian),
    );
    if let Some(records) = &layout.joliet_path_table {
        write_at(
            &mut buffer,
            layout.joliet_path_table_le,
            &path_table::encode_table(records, EndianType::LittleEndian),
        );
        write_at(
            &mut buffer,
            layout.joliet_path_table_be,
            &path_table::encode_table(records, EndianType::BigEndian),
        );
    }

    // 4. Directory trees.
    write_tree_directories(&mut buffer, pvd_tree);
    if let Some(joliet_tree) = joliet_tree {
        write_tree_directories(&mut buffer, joliet_tree);
    }

    // 5. El Torito boot catalog.
    if let (Some(eltorito), Some(catalog_extent)) = (eltorito, layout.boot_catalog_extent) {
        let catalog = BootCatalogue::new(
            eltorito.platform_id,
            eltorito.media_type,
            eltorito.load_segment,
            eltorito.boot_content_len.div_ceil(512) as u16,
            eltorito.boot_content_extent,
        );
        let mut catalog_bytes = Vec::new();
        catalog.write(&mut catalog_bytes)?;
        write_at(&mut buffer, catalog_extent, &catalog_bytes);
    }

    // 6. File content.
    write_tree_content(&mut buffer, pvd_tree, content);

    sink.write_all(&buffer)?;
    Ok(())
}
