//! Base types for the fixed-layout parts of MNF and ZOSFT files.
//!
//! Block framing (counts and size words) is big endian, record contents are
//! little endian.

use binrw::{BinRead, BinWrite};

use crate::compression::CompressionType;

/// A structure whose encoded length never changes
pub trait FixedSize {
    /// Encoded length in bytes
    const SIZE: u64;
}

impl FixedSize for TableBlockHeader {
    const SIZE: u64 = 16;
}

impl FixedSize for SubStreamHeader {
    const SIZE: u64 = 8;
}

impl FixedSize for NameTableHeader {
    const SIZE: u64 = 14;
}

/// Leading bytes of a manifest file
pub const MNF_MAGIC: &[u8; 4] = b"MES2";

/// The only manifest version this reader understands
pub const MNF_VERSION: u16 = 3;

/// Leading bytes of a name table payload
pub const ZOSFT_MAGIC: &[u8; 5] = b"ZOSFT";

/// Fixed fields at the start of a table block, after its type tag
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(big)]
pub struct TableBlockHeader {
    /// Opaque, never interpreted
    #[brw(little)]
    pub unknown: u32,

    pub record1a_count: u32,

    pub record1b_count: u32,

    /// The number of joined records the block describes
    pub record23_count: u32,
}

/// Size words in front of each compressed sub-stream
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(big)]
pub struct SubStreamHeader {
    pub decompressed_size: u32,
    pub compressed_size: u32,
}

/// One 8 byte record of manifest stream 1
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct FileKey {
    /// Key into the name table
    pub file_index: u32,

    pub aux_flag: u32,
}

impl FileKey {
    /// The same 8 bytes read as one little endian value
    pub fn file_id(&self) -> u64 {
        (self.aux_flag as u64) << 32 | self.file_index as u64
    }
}

/// One 20 byte record of manifest stream 2, as laid out on disk
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct FileRecord {
    pub size: u32,
    pub compressed_size: u32,
    pub hash: u32,
    pub offset: u32,
    pub byte16: u8,
    pub byte17: u8,
    pub unk2: u16,
}

/// Where an entry's bytes live and how they are stored
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileLocation {
    /// Size once decompressed
    pub size: u32,

    /// Size inside the shard
    pub compressed_size: u32,

    /// Opaque checksum
    pub hash: u32,

    /// Offset inside the shard
    pub offset: u32,

    pub compression_type: CompressionType,

    /// Number of the shard holding the bytes
    pub archive_index: u8,

    /// Opaque
    pub unk2: u16,
}

impl From<FileRecord> for FileLocation {
    /// Bytes 16 and 17 are swapped in this manifest version, the
    /// compression type lives in byte 17 and the shard number in byte 16.
    fn from(record: FileRecord) -> Self {
        FileLocation {
            size: record.size,
            compressed_size: record.compressed_size,
            hash: record.hash,
            offset: record.offset,
            compression_type: CompressionType::from(record.byte17),
            archive_index: record.byte16,
            unk2: record.unk2,
        }
    }
}

/// Fixed fields after the ZOSFT magic
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct NameTableHeader {
    pub unknown1: u16,
    pub unknown2: u32,
    pub unknown3: u32,

    /// The number of named records
    pub record_count: u32,
}

/// One 8 byte record of the third name table block, stream 0
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct NameKey {
    pub file_index: u32,
    pub user_data: u32,
}

/// One 12 byte record of the third name table block, stream 1
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct NameLocation {
    /// Offset of the name inside the string region
    pub file_name_offset: u32,

    pub file_id: u64,
}
