//! Flat rows for storing a session in a relational table.
//!
//! Every column is a scalar so rows map directly onto a database table or a
//! JSON array. Fields missing from the archive are left `None`.

use serde::Serialize;

use crate::{link::ResolvedEntry, names::NameEntry};

/// One manifest entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestRow {
    pub index: u32,

    /// The 64 bit file id as 16 hex digits, little endian byte order
    #[serde(rename = "FileID")]
    pub file_id: Option<String>,

    pub file_index: Option<u32>,

    #[serde(rename = "ID1")]
    pub id1: Option<u32>,

    pub aux_flag: Option<u32>,

    pub size: Option<u32>,
    pub compressed_size: Option<u32>,
    pub hash: Option<u32>,
    pub offset: Option<u32>,
    pub compress_type: Option<u8>,
    pub archive_index: Option<u8>,
    pub unk2: Option<u16>,

    /// The linked name, as stored in the name table
    pub file_name: Option<String>,
}

impl From<ResolvedEntry<'_>> for ManifestRow {
    fn from(entry: ResolvedEntry<'_>) -> Self {
        let manifest = entry.manifest;
        let location = manifest.location;

        ManifestRow {
            index: manifest.index,
            file_id: manifest.file_id.map(file_id_hex),
            file_index: manifest.file_index,
            id1: manifest.id1,
            aux_flag: manifest.aux_flag,
            size: location.map(|l| l.size),
            compressed_size: location.map(|l| l.compressed_size),
            hash: location.map(|l| l.hash),
            offset: location.map(|l| l.offset),
            compress_type: location.map(|l| l.compression_type.into()),
            archive_index: location.map(|l| l.archive_index),
            unk2: location.map(|l| l.unk2),
            file_name: entry.file_name().map(str::to_owned),
        }
    }
}

/// One name table record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameRow {
    pub file_index: Option<u32>,
    pub file_name: String,
    pub filename_offset: Option<u32>,

    #[serde(rename = "FileID")]
    pub file_id: Option<u64>,

    pub user_data: Option<u32>,
    pub index: u32,
    pub index11: Option<u32>,
    pub index13: Option<u32>,
    pub index21: Option<u32>,
    pub reference_count: u32,
}

impl From<&NameEntry> for NameRow {
    fn from(entry: &NameEntry) -> Self {
        NameRow {
            file_index: entry.file_index,
            file_name: entry.file_name.clone(),
            filename_offset: entry.file_name_offset,
            file_id: entry.file_id,
            user_data: entry.user_data,
            index: entry.index,
            index11: entry.idx_a,
            index13: entry.idx_b,
            index21: entry.idx_c,
            reference_count: entry.reference_count,
        }
    }
}

/// Render a file id the way it is laid out on disk
///
/// ```
/// assert_eq!(eso_mnf::table::file_id_hex(0x0000_0001_0000_0014), "1400000001000000");
/// ```
pub fn file_id_hex(file_id: u64) -> String {
    file_id
        .to_le_bytes()
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect()
}
