//! The ZOSFT name table that maps file indices to paths.
//!
//! The name table is stored as an ordinary manifest entry. Its payload is a
//! small manifest-shaped structure of its own:
//!
//! | Offset  | Field         | Description                                          |
//! |---------|---------------|------------------------------------------------------|
//! | 0x0000  | Magic         | 5 bytes: "ZOSFT"                                     |
//! | 0x0005  | Unknown       | 10 bytes: opaque                                     |
//! | 0x000F  | Record Count  | 4 bytes: number of named records                     |
//! | 0x0013  | Blocks        | 3 nested table blocks, the first two may be empty    |
//! | ...     | String Length | 4 bytes: size of the string region                   |
//! | ...     | Strings       | NUL terminated names, addressed by byte offset       |

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use binrw::Endian;
use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::{
    block::{read_nested_table, TableBlock},
    cursor::BinaryCursor,
    error::{Error, Result},
    scan::{SparseScanner, StrideScanner},
    types::{NameKey, NameLocation, NameTableHeader, ZOSFT_MAGIC},
};

const INDEX_STRIDE: usize = 4;
const KEY_STRIDE: usize = 8;
const LOCATION_STRIDE: usize = 12;

/// Names from the string region, keyed by their starting offset
///
/// Bytes are decoded one code point each, so any byte sequence round trips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: IndexMap<u32, String>,
}

impl StringTable {
    /// Split a NUL separated region
    ///
    /// A final run without a terminator is still kept.
    pub fn parse(region: &[u8]) -> Self {
        let mut strings = IndexMap::new();

        let mut start = 0usize;
        for (position, byte) in region.iter().enumerate() {
            if *byte == 0 {
                strings.insert(start as u32, decode_latin1(&region[start..position]));
                start = position + 1;
            }
        }
        if start < region.len() {
            strings.insert(start as u32, decode_latin1(&region[start..]));
        }

        StringTable { strings }
    }

    /// The string starting at `offset`
    pub fn get(&self, offset: u32) -> Option<&str> {
        self.strings.get(&offset).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// `(offset, string)` pairs in region order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.strings.iter().map(|(o, s)| (*o, s.as_str()))
    }

    /// Join the strings back into a NUL terminated region
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut region = Vec::new();
        for string in self.strings.values() {
            region.extend(string.chars().map(|c| c as u32 as u8));
            region.push(0);
        }
        region
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// One named record of the name table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameEntry {
    /// Position in the table
    pub index: u32,

    /// Sparse tag from the first nested block
    pub idx_a: Option<u32>,

    /// Contiguous index from the first nested block
    pub idx_b: Option<u32>,

    /// Sparse tag from the second nested block
    pub idx_c: Option<u32>,

    /// Key shared with [`crate::manifest::ManifestEntry::file_index`]
    pub file_index: Option<u32>,

    /// Opaque
    pub user_data: Option<u32>,

    pub file_name_offset: Option<u32>,

    /// Resolved name, empty when the offset has no string
    pub file_name: String,

    pub file_id: Option<u64>,

    /// Number of manifest entries linked to this name
    pub reference_count: u32,
}

/// A parsed ZOSFT payload
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    header: NameTableHeader,
    entries: Vec<NameEntry>,
    strings: StringTable,
    by_file_index: HashMap<u32, usize>,
}

impl NameTable {
    /// Parse an extracted name table payload
    #[instrument(skip(data), fields(len = data.len()), err)]
    pub fn parse(data: &[u8]) -> Result<Self> {
        if !data.starts_with(ZOSFT_MAGIC) {
            return Err(Error::InvalidNameTable(format!(
                "expected ZOSFT magic, found {:02X?}",
                &data[..data.len().min(ZOSFT_MAGIC.len())]
            )));
        }

        let mut cursor = BinaryCursor::new(Cursor::new(data))?;
        cursor.skip(ZOSFT_MAGIC.len() as u64)?;
        let header: NameTableHeader = cursor.read_struct()?;
        debug!("name table declares {} records", header.record_count);

        let blocks = [
            read_nested_table(&mut cursor)?,
            read_nested_table(&mut cursor)?,
            read_nested_table(&mut cursor)?,
        ];

        let stream_len: usize = blocks.iter().map(TableBlock::stream_len).sum();
        if header.record_count as usize > stream_len {
            return Err(Error::InvalidNameTable(format!(
                "{} records declared but the blocks hold {stream_len} bytes",
                header.record_count
            )));
        }

        let strings = read_strings(&mut cursor)?;
        debug!("name table has {} strings", strings.len());

        let entries = build_entries(header.record_count, &blocks, &strings)?;

        let mut by_file_index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if let Some(file_index) = entry.file_index {
                by_file_index.insert(file_index, position);
            }
        }

        Ok(NameTable {
            header,
            entries,
            strings,
            by_file_index,
        })
    }

    pub fn header(&self) -> &NameTableHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NameEntry] {
        &self.entries
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn get(&self, position: usize) -> Option<&NameEntry> {
        self.entries.get(position)
    }

    /// Position of the entry carrying `file_index`
    pub fn position_of(&self, file_index: u32) -> Option<usize> {
        self.by_file_index.get(&file_index).copied()
    }

    pub fn by_file_index(&self, file_index: u32) -> Option<&NameEntry> {
        self.position_of(file_index).map(|p| &self.entries[p])
    }

    pub(crate) fn entry_mut(&mut self, position: usize) -> Option<&mut NameEntry> {
        self.entries.get_mut(position)
    }
}

fn read_strings<R: Read + Seek>(cursor: &mut BinaryCursor<R>) -> Result<StringTable> {
    let length = cursor.read_u32(Endian::Little)?;
    let region = cursor.read_bytes(length as u64)?;
    Ok(StringTable::parse(&region))
}

fn build_entries(
    count: u32,
    blocks: &[TableBlock; 3],
    strings: &StringTable,
) -> Result<Vec<NameEntry>> {
    let mut idx_a = SparseScanner::new(blocks[0].stream(0));
    let mut idx_b = StrideScanner::new(blocks[0].stream(1), INDEX_STRIDE);
    let mut idx_c = SparseScanner::new(blocks[1].stream(0));
    let mut keys = StrideScanner::new(blocks[2].stream(0), KEY_STRIDE);
    let mut locations = StrideScanner::new(blocks[2].stream(1), LOCATION_STRIDE);

    let mut entries = Vec::with_capacity(count as usize);
    for index in 0..count {
        let key: Option<NameKey> = keys.next_record()?;
        let location: Option<NameLocation> = locations.next_record()?;
        let file_name_offset = location.map(|l| l.file_name_offset);

        let entry = NameEntry {
            index,
            idx_a: idx_a.next(),
            idx_b: idx_b
                .next_bytes()
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            idx_c: idx_c.next(),
            file_index: key.map(|k| k.file_index),
            user_data: key.map(|k| k.user_data),
            file_name_offset,
            file_name: file_name_offset
                .and_then(|o| strings.get(o))
                .unwrap_or_default()
                .to_owned(),
            file_id: location.map(|l| l.file_id),
            reference_count: 0,
        };
        trace!("{entry:?}");
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::{NameTable, StringTable};
    use crate::error::{Error, Result};
    use crate::testing::encode_name_table;

    #[test]
    fn split_string_region() {
        let table = StringTable::parse(b"/art/a.dds\0/esoui/b.lua\0\0tail");

        assert_eq!(table.len(), 4);
        assert_eq!(table.get(0), Some("/art/a.dds"));
        assert_eq!(table.get(11), Some("/esoui/b.lua"));
        assert_eq!(table.get(24), Some(""));
        assert_eq!(table.get(25), Some("tail"));
        assert_eq!(table.get(1), None);
    }

    #[test]
    fn split_join_round_trip() {
        let region = b"/a/first.xml\0/b/second.dds\0/c/\xE9t\xE9.txt\0".to_vec();

        let table = StringTable::parse(&region);
        assert_eq!(table.to_bytes(), region);

        let again = StringTable::parse(&table.to_bytes());
        assert_eq!(again, table);
    }

    #[test]
    fn non_ascii_bytes_are_single_code_points() {
        let table = StringTable::parse(b"caf\xE9\0\xFF\xFE\0");

        assert_eq!(table.get(0), Some("caf\u{e9}"));
        assert_eq!(table.get(5).map(|s| s.chars().count()), Some(2));
    }

    #[traced_test]
    #[test]
    fn parse_name_table() -> Result<()> {
        let data = encode_name_table(&[(10, "/art/a.dds"), (20, "/esoui/b.lua")]);
        let table = NameTable::parse(&data)?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.header().record_count, 2);

        let second = table.by_file_index(20).unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.file_name, "/esoui/b.lua");
        assert_eq!(second.file_name_offset, Some(11));
        assert_eq!(second.file_id, Some(0x1001));
        assert_eq!(second.idx_a, Some(0x8000_0001));
        assert_eq!(second.idx_b, Some(2));
        // the second nested block is empty
        assert_eq!(second.idx_c, None);
        assert_eq!(second.reference_count, 0);

        Ok(())
    }

    #[test]
    fn unresolved_offset_gives_empty_name() -> Result<()> {
        let mut data = encode_name_table(&[(10, "/art/a.dds")]);
        // cut the string region down to nothing
        let cut = data.len() - "/art/a.dds\0".len() - 4;
        data.truncate(cut);
        data.extend(0u32.to_le_bytes());

        let table = NameTable::parse(&data)?;
        assert_eq!(table.by_file_index(10).map(|e| e.file_name.as_str()), Some(""));

        Ok(())
    }

    #[test]
    fn reject_bad_magic() {
        let result = NameTable::parse(b"ZOSXX\0\0\0\0");
        assert!(matches!(result, Err(Error::InvalidNameTable(_))));

        let result = NameTable::parse(b"ZO");
        assert!(matches!(result, Err(Error::InvalidNameTable(_))));
    }

    #[test]
    fn truncated_name_table() {
        let data = encode_name_table(&[(10, "/art/a.dds")]);
        let result = NameTable::parse(&data[..40]);
        assert!(matches!(result, Err(Error::TruncatedRead { .. })));
    }

    #[test]
    fn record_count_beyond_block_data() {
        let mut data = encode_name_table(&[(10, "/art/a.dds")]);
        // record count follows the magic and ten opaque bytes
        data[15..19].copy_from_slice(&u32::MAX.to_le_bytes());

        let result = NameTable::parse(&data);
        assert!(matches!(result, Err(Error::InvalidNameTable(_))));
    }
}
