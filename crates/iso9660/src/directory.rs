use std::io::Write;

use crate::types::{DecDateTime, IsoStringFile, U16LsbMsb, U32LsbMsb};

/// The header of a directory record, fixed-width; the identifier that follows
/// it is variable length.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectoryRecordHeader {
    pub len: u8,
    pub extended_attr_record: u8,
    /// The LBA of the record
    pub extent: U32LsbMsb,
    /// The length of the data in bytes
    pub data_len: U32LsbMsb,
    pub date_time: DirDateTime,
    pub flags: u8,
    pub file_unit_size: u8,
    pub interleave_gap_size: u8,
    pub volume_sequence_number: U16LsbMsb,
    pub file_identifier_len: u8,
}

impl Default for DirectoryRecordHeader {
    fn default() -> Self {
        Self {
            len: 0,
            extended_attr_record: 0,
            extent: U32LsbMsb::new(0),
            data_len: U32LsbMsb::new(0),
            date_time: DirDateTime::default(),
            flags: 0,
            file_unit_size: 0,
            interleave_gap_size: 0,
            volume_sequence_number: U16LsbMsb::new(1),
            file_identifier_len: 0,
        }
    }
}

impl DirectoryRecordHeader {
    pub fn from_bytes(bytes: &[u8]) -> &Self {
        bytemuck::from_bytes(bytes)
    }

    pub fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn is_directory(&self) -> bool {
        FileFlags::from_bits_retain(self.flags).contains(FileFlags::DIRECTORY)
    }
}

/// Length, in bytes, of an encoded directory record for an identifier of
/// `name_len` bytes, including the parity padding byte (spec.md §3.6).
pub fn record_len(name_len: usize) -> u8 {
    (((size_of::<DirectoryRecordHeader>() + name_len + 1) & !1) as u8).max(34)
}

#[derive(Debug, Clone)]
pub struct DirectoryRecord {
    pub header: DirectoryRecordHeader,
    pub name: IsoStringFile,
}

impl DirectoryRecord {
    pub fn size(&self) -> usize {
        record_len(self.name.len()) as usize
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.extend_from_slice(bytemuck::bytes_of(&self.header));
        bytes.extend_from_slice(self.name.bytes());
        bytes.resize(self.size(), 0);
        bytes
    }

    pub fn new(name: &[u8], extent: u32, data_length: u32, flags: FileFlags) -> Self {
        Self {
            header: DirectoryRecordHeader {
                len: record_len(name.len()),
                extended_attr_record: 0,
                extent: U32LsbMsb::new(extent),
                data_len: U32LsbMsb::new(data_length),
                date_time: DirDateTime::default(),
                flags: flags.bits(),
                file_unit_size: 0,
                interleave_gap_size: 0,
                volume_sequence_number: U16LsbMsb::new(1),
                file_identifier_len: name.len() as u8,
            },
            name: IsoStringFile::from_bytes(name),
        }
    }

    pub fn directory(name: &[u8], extent: u32, data_length: u32) -> Self {
        Self::new(name, extent, data_length, FileFlags::DIRECTORY)
    }

    pub fn file(name: &[u8], extent: u32, data_length: u32) -> Self {
        Self::new(name, extent, data_length, FileFlags::empty())
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize, std::io::Error> {
        let bytes = self.to_bytes();
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Parses a single directory record out of `bytes`, which must start at
    /// the record's first byte. Returns the record and the number of bytes
    /// it occupied.
    pub fn parse(bytes: &[u8]) -> (Self, usize) {
        let header = *DirectoryRecordHeader::from_bytes(&bytes[..size_of::<DirectoryRecordHeader>()]);
        let name_start = size_of::<DirectoryRecordHeader>();
        let name_end = name_start + header.file_identifier_len as usize;
        let name = IsoStringFile::from_bytes(&bytes[name_start..name_end]);
        (Self { header, name }, header.len as usize)
    }
}

/// The root directory entry embedded directly in the PVD/SVD.
#[repr(C)]
#[derive(Default, Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RootDirectoryEntry {
    pub header: DirectoryRecordHeader,
    /// There is no name on the root directory, so this is always empty
    pub padding: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirDateTime {
    /// Number of years since 1900
    year: u8,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    offset: u8,
}

impl Default for DirDateTime {
    fn default() -> Self {
        Self {
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            offset: 0,
        }
    }
}

bitflags::bitflags! {
    pub struct FileFlags: u8 {
        const HIDDEN = 0b0000_0001;
        const DIRECTORY = 0b0000_0010;
        const ASSOCIATED_FILE = 0b0000_0100;
        const EXTENDED_ATTRIBUTES = 0b0000_1000;
        const EXTENDED_PERMISSIONS = 0b0001_0000;
        const NOT_FINAL = 0b1000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_record_is_34_bytes() {
        assert_eq!(record_len(1), 34);
    }

    #[test]
    fn four_char_identifier_is_38_bytes() {
        assert_eq!(record_len(4), 38);
    }

    #[test]
    fn six_char_identifier_is_40_bytes() {
        assert_eq!(record_len(6), 40);
    }

    #[test]
    fn roundtrip_through_bytes() {
        let record = DirectoryRecord::file(b"FOO.;1", 100, 4);
        let bytes = record.to_bytes();
        let (parsed, len) = DirectoryRecord::parse(&bytes);
        assert_eq!(len, record.size());
        assert_eq!(parsed.header.extent.read(), 100);
        assert_eq!(parsed.header.data_len.read(), 4);
        assert_eq!(parsed.name.to_str(), "FOO.;1");
    }
}
