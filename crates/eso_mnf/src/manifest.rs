//! The primary file table of a manifest.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::{
    block::TableBlock,
    error::{Error, Result},
    scan::{SparseScanner, StrideScanner},
    types::{FileKey, FileLocation, FileRecord},
};

const KEY_STRIDE: usize = 8;
const RECORD_STRIDE: usize = 20;

/// One logical file described by the manifest
///
/// Each field group comes from a different stream of the table block. A stream
/// that ran out before this entry leaves its fields as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Position in the table
    pub index: u32,

    /// Sparse tag from stream 0
    pub id1: Option<u32>,

    /// Key into the name table
    pub file_index: Option<u32>,

    pub aux_flag: Option<u32>,

    /// The stream 1 record read as one 64 bit value
    pub file_id: Option<u64>,

    /// Storage details from stream 2
    pub location: Option<FileLocation>,
}

impl ManifestEntry {
    /// Build one entry by pulling the next record from every stream
    pub fn read(
        index: u32,
        ids: &mut SparseScanner<'_>,
        keys: &mut StrideScanner<'_>,
        records: &mut StrideScanner<'_>,
    ) -> Result<Self> {
        let key: Option<FileKey> = keys.next_record()?;
        let record: Option<FileRecord> = records.next_record()?;

        let entry = ManifestEntry {
            index,
            id1: ids.next(),
            file_index: key.map(|k| k.file_index),
            aux_flag: key.map(|k| k.aux_flag),
            file_id: key.map(|k| k.file_id()),
            location: record.map(FileLocation::from),
        };
        trace!("{entry:?}");

        Ok(entry)
    }

    pub fn size(&self) -> u32 {
        self.location.map_or(0, |l| l.size)
    }

    pub fn compressed_size(&self) -> u32 {
        self.location.map_or(0, |l| l.compressed_size)
    }

    pub fn archive_index(&self) -> Option<u8> {
        self.location.map(|l| l.archive_index)
    }
}

/// All manifest entries plus the lookup maps built over them
///
/// Map values are positions in [`ManifestTable::entries`]. On key collisions
/// the later entry wins.
#[derive(Debug, Clone, Default)]
pub struct ManifestTable {
    entries: Vec<ManifestEntry>,
    by_hash: HashMap<u32, usize>,
    by_file_index: HashMap<u32, usize>,
    by_internal_index: HashMap<u32, usize>,
}

impl ManifestTable {
    /// Join the three streams of a table block into entries
    #[instrument(skip(block), fields(records = block.record23_count()), err)]
    pub fn from_block(block: &TableBlock) -> Result<Self> {
        let count = block.record23_count();
        // every record occupies at least one byte of some stream
        if count as usize > block.stream_len() {
            return Err(Error::CustomError(format!(
                "table declares {count} records but its streams hold {} bytes",
                block.stream_len()
            )));
        }

        let mut ids = SparseScanner::new(block.stream(0));
        let mut keys = StrideScanner::new(block.stream(1), KEY_STRIDE);
        let mut records = StrideScanner::new(block.stream(2), RECORD_STRIDE);

        let mut entries = Vec::with_capacity(count as usize);
        for index in 0..count {
            entries.push(ManifestEntry::read(index, &mut ids, &mut keys, &mut records)?);
        }

        let table = Self::from_entries(entries);
        debug!(
            "manifest table: {} entries, {} file indices, {} hashes",
            table.len(),
            table.by_file_index.len(),
            table.by_hash.len()
        );
        Ok(table)
    }

    /// Index a list of entries
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        let mut by_hash = HashMap::with_capacity(entries.len());
        let mut by_file_index = HashMap::with_capacity(entries.len());
        let mut by_internal_index = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            if let Some(location) = entry.location {
                by_hash.insert(location.hash, position);
            }
            if let Some(file_index) = entry.file_index {
                by_file_index.insert(file_index, position);
            }
            if let Some(id1) = entry.id1 {
                by_internal_index.insert(id1, position);
            }
        }

        ManifestTable {
            entries,
            by_hash,
            by_file_index,
            by_internal_index,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&ManifestEntry> {
        self.entries.get(position)
    }

    pub fn by_hash(&self, hash: u32) -> Option<&ManifestEntry> {
        self.by_hash.get(&hash).map(|&p| &self.entries[p])
    }

    pub fn by_file_index(&self, file_index: u32) -> Option<&ManifestEntry> {
        self.by_file_index.get(&file_index).map(|&p| &self.entries[p])
    }

    pub fn by_internal_index(&self, id1: u32) -> Option<&ManifestEntry> {
        self.by_internal_index.get(&id1).map(|&p| &self.entries[p])
    }
}
