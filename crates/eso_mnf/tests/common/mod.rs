//! Builds small synthetic archives for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use eso_mnf::ArchiveVariant;
use flate2::{write::ZlibEncoder, Compression};

pub fn zlib(data: &[u8]) -> Vec<u8> {
    zlib_with(data, Compression::default())
}

fn zlib_with(data: &[u8], level: Compression) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Wrap content in the two length-prefixed header fields of a client payload
pub fn client_payload(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in [&b"hdr"[..], &b"\x01\x02"[..]] {
        out.write_u32::<LittleEndian>(field.len() as u32).unwrap();
        out.extend(field);
    }
    out.extend(content);
    out
}

/// How a file is stored in its shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// zlib stream, compression byte 0
    Zlib,
    /// zlib stream at the best level (header `78 DA`), compression byte 1
    Deflate,
    /// stored as is, compression byte 0
    Raw,
    /// bytes handed over untouched, with the given compression byte
    Verbatim(u8),
}

#[derive(Debug, Clone)]
pub struct SyntheticFile {
    pub file_index: u32,
    pub aux_flag: u32,
    pub name: Option<String>,
    pub content: Vec<u8>,
    pub storage: Storage,
}

impl SyntheticFile {
    pub fn named(file_index: u32, name: &str, content: &[u8]) -> Self {
        SyntheticFile {
            file_index,
            aux_flag: 0,
            name: Some(name.to_owned()),
            content: content.to_vec(),
            storage: Storage::Zlib,
        }
    }

    pub fn unnamed(file_index: u32, content: &[u8]) -> Self {
        SyntheticFile {
            file_index,
            aux_flag: 0,
            name: None,
            content: content.to_vec(),
            storage: Storage::Zlib,
        }
    }

    pub fn stored(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    pub fn flagged(mut self, aux_flag: u32) -> Self {
        self.aux_flag = aux_flag;
        self
    }
}

pub struct SyntheticArchive {
    pub manifest: Vec<u8>,
    pub shards: BTreeMap<u8, Vec<u8>>,
}

struct Record {
    file_index: u32,
    aux_flag: u32,
    size: u32,
    compressed_size: u32,
    offset: u32,
    archive_index: u8,
    compression: u8,
}

/// An archive whose name table is the first entry, followed by `files`
///
/// Files alternate between shards 0 and 1.
pub fn build_archive(variant: ArchiveVariant, files: &[SyntheticFile]) -> SyntheticArchive {
    let names: Vec<(u32, &str)> = files
        .iter()
        .filter_map(|f| f.name.as_deref().map(|n| (f.file_index, n)))
        .collect();
    build_archive_with_name_table(variant, &name_table(&names), files)
}

/// Like [`build_archive`] with the name table payload supplied by the caller
pub fn build_archive_with_name_table(
    variant: ArchiveVariant,
    name_table: &[u8],
    files: &[SyntheticFile],
) -> SyntheticArchive {
    let mut shards: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    let mut records = Vec::new();

    let mut store = |archive_index: u8, file_index, aux_flag, size, stored: Vec<u8>, compression| {
        let shard = shards.entry(archive_index).or_default();
        // some padding so offsets are never zero
        shard.extend([0xEE; 5]);
        records.push(Record {
            file_index,
            aux_flag,
            size,
            compressed_size: stored.len() as u32,
            offset: shard.len() as u32,
            archive_index,
            compression,
        });
        shard.extend(stored);
    };

    store(
        0,
        variant.name_table_key(),
        0,
        name_table.len() as u32,
        zlib(name_table),
        0,
    );

    for (i, file) in files.iter().enumerate() {
        let content = match variant {
            ArchiveVariant::Client => client_payload(&file.content),
            ArchiveVariant::Depot => file.content.clone(),
        };

        let (stored, compression) = match file.storage {
            Storage::Zlib => (zlib(&content), 0),
            Storage::Deflate => (zlib_with(&content, Compression::best()), 1),
            Storage::Raw => (content.clone(), 0),
            Storage::Verbatim(compression) => (file.content.clone(), compression),
        };

        store(
            (i % 2) as u8,
            file.file_index,
            file.aux_flag,
            content.len() as u32,
            stored,
            compression,
        );
    }

    SyntheticArchive {
        manifest: manifest(&records),
        shards,
    }
}

fn manifest(records: &[Record]) -> Vec<u8> {
    let mut ids = Vec::new();
    let mut keys = Vec::new();
    let mut locations = Vec::new();

    for (i, record) in records.iter().enumerate() {
        ids.write_u32::<LittleEndian>(0x8000_0000 | i as u32).unwrap();

        keys.write_u32::<LittleEndian>(record.file_index).unwrap();
        keys.write_u32::<LittleEndian>(record.aux_flag).unwrap();

        locations.write_u32::<LittleEndian>(record.size).unwrap();
        locations.write_u32::<LittleEndian>(record.compressed_size).unwrap();
        locations.write_u32::<LittleEndian>(0x1234_0000 | i as u32).unwrap();
        locations.write_u32::<LittleEndian>(record.offset).unwrap();
        locations.write_u8(record.archive_index).unwrap();
        locations.write_u8(record.compression).unwrap();
        locations.write_u16::<LittleEndian>(0).unwrap();
    }

    let table = table_block(records.len() as u32, &[ids, keys, locations]);

    let mut out = Vec::new();
    out.extend(b"MES2");
    out.write_u16::<LittleEndian>(3).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(table.len() as u32).unwrap();
    out.extend(table);
    out
}

fn table_block(count: u32, streams: &[Vec<u8>; 3]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<BigEndian>(3).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    for _ in 0..3 {
        out.write_u32::<BigEndian>(count).unwrap();
    }

    for stream in streams {
        let compressed = zlib(stream);
        out.write_u32::<BigEndian>(stream.len() as u32).unwrap();
        out.write_u32::<BigEndian>(compressed.len() as u32).unwrap();
        out.extend(compressed);
    }
    out
}

fn empty_block() -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<BigEndian>(3).unwrap();
    out.extend([0u8; 16]);
    out.extend([0u8; 8]);
    out
}

/// A ZOSFT payload naming each `(file_index, name)`
pub fn name_table(names: &[(u32, &str)]) -> Vec<u8> {
    let count = names.len() as u32;

    let mut idx_a = Vec::new();
    let mut idx_b = Vec::new();
    let mut keys = Vec::new();
    let mut locations = Vec::new();
    let mut strings = Vec::new();

    for (i, (file_index, name)) in names.iter().enumerate() {
        let i = i as u32;
        idx_a.write_u32::<LittleEndian>(0x8000_0000 | i).unwrap();
        idx_b.write_u32::<LittleEndian>(i).unwrap();

        keys.write_u32::<LittleEndian>(*file_index).unwrap();
        keys.write_u32::<LittleEndian>(0).unwrap();

        locations.write_u32::<LittleEndian>(strings.len() as u32).unwrap();
        locations.write_u64::<LittleEndian>(*file_index as u64).unwrap();

        strings.extend(name.bytes());
        strings.push(0);
    }

    let mut out = Vec::new();
    out.extend(b"ZOSFT");
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(count).unwrap();
    out.extend(table_block(count, &[idx_a, idx_b, Vec::new()]));
    out.extend(empty_block());
    out.extend(table_block(count, &[keys, locations, Vec::new()]));
    out.write_u32::<LittleEndian>(strings.len() as u32).unwrap();
    out.extend(strings);
    out
}
