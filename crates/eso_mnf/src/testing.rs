//! Builders for synthetic manifests and name tables used by unit tests.

use std::io::{Cursor, Write};

use binrw::BinWrite;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use flate2::{write::ZlibEncoder, Compression};

use crate::types::{
    FileKey, FileRecord, NameKey, NameLocation, NameTableHeader, SubStreamHeader,
    TableBlockHeader, MNF_MAGIC, MNF_VERSION, ZOSFT_MAGIC,
};

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn write_struct<T>(out: &mut Vec<u8>, value: &T)
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(Vec::new());
    value
        .write_options(&mut cursor, binrw::Endian::Little, ())
        .unwrap();
    out.extend(cursor.into_inner());
}

/// A table block including its type tag
pub fn encode_table_block(record23_count: u32, streams: &[Vec<u8>; 3]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<BigEndian>(3).unwrap();
    write_struct(
        &mut out,
        &TableBlockHeader {
            unknown: 0,
            record1a_count: record23_count,
            record1b_count: record23_count,
            record23_count,
        },
    );

    for stream in streams {
        let compressed = zlib(stream);
        write_struct(
            &mut out,
            &SubStreamHeader {
                decompressed_size: stream.len() as u32,
                compressed_size: compressed.len() as u32,
            },
        );
        out.extend(compressed);
    }
    out
}

pub fn encode_empty_nested_block() -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<BigEndian>(3).unwrap();
    write_struct(&mut out, &TableBlockHeader::default());
    out.extend([0u8; 8]);
    out
}

/// A full manifest with `skip_blocks` type 0 blocks in front of the table
pub fn encode_manifest(table: &[u8], skip_blocks: usize) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(MNF_MAGIC);
    out.write_u16::<LittleEndian>(MNF_VERSION).unwrap();
    out.write_u16::<LittleEndian>(2).unwrap();
    out.extend([0x00, 0x00, 0x01, 0x00]);
    out.write_u32::<LittleEndian>(0xCAFE).unwrap();
    out.write_u32::<LittleEndian>(table.len() as u32).unwrap();

    for _ in 0..skip_blocks {
        out.write_u16::<BigEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        for payload in [&b"abc"[..], &b"defg"[..]] {
            out.write_u32::<BigEndian>(payload.len() as u32).unwrap();
            out.extend(payload);
        }
    }

    out.extend(table);
    out
}

pub fn sparse_stream(ids: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    for id in ids {
        // untagged filler between tagged windows
        out.extend([0x11, 0x22, 0x33, 0x00]);
        out.write_u32::<LittleEndian>(id | 0x8000_0000).unwrap();
    }
    out
}

pub fn key_stream(keys: &[(u32, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (file_index, aux_flag) in keys {
        write_struct(
            &mut out,
            &FileKey {
                file_index: *file_index,
                aux_flag: *aux_flag,
            },
        );
    }
    out
}

pub fn record_stream(records: &[FileRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        write_struct(&mut out, record);
    }
    out
}

/// A manifest table block with one record per `(file_index, aux_flag, record)`
pub fn encode_manifest_table(entries: &[(u32, u32, FileRecord)]) -> Vec<u8> {
    let ids: Vec<u32> = (0..entries.len() as u32).map(|i| 100 + i).collect();
    let keys: Vec<(u32, u32)> = entries.iter().map(|(k, a, _)| (*k, *a)).collect();
    let records: Vec<FileRecord> = entries.iter().map(|(_, _, r)| *r).collect();

    encode_table_block(
        entries.len() as u32,
        &[sparse_stream(&ids), key_stream(&keys), record_stream(&records)],
    )
}

/// A ZOSFT payload naming each `(file_index, name)`
pub fn encode_name_table(names: &[(u32, &str)]) -> Vec<u8> {
    let count = names.len() as u32;

    let mut strings = Vec::new();
    let mut keys = Vec::new();
    let mut locations = Vec::new();
    for (i, (file_index, name)) in names.iter().enumerate() {
        write_struct(
            &mut locations,
            &NameLocation {
                file_name_offset: strings.len() as u32,
                file_id: 0x1000 + i as u64,
            },
        );
        write_struct(
            &mut keys,
            &NameKey {
                file_index: *file_index,
                user_data: 0,
            },
        );
        strings.extend(name.bytes());
        strings.push(0);
    }

    let idx_a: Vec<u32> = (0..count).collect();
    let mut idx_b = Vec::new();
    for i in 0..count {
        idx_b.write_u32::<LittleEndian>(i * 2).unwrap();
    }

    let mut out = Vec::new();
    out.extend(ZOSFT_MAGIC);
    write_struct(
        &mut out,
        &NameTableHeader {
            record_count: count,
            ..Default::default()
        },
    );
    out.extend(encode_table_block(
        count,
        &[sparse_stream(&idx_a), idx_b, Vec::new()],
    ));
    out.extend(encode_empty_nested_block());
    out.extend(encode_table_block(count, &[keys, locations, Vec::new()]));
    out.write_u32::<LittleEndian>(strings.len() as u32).unwrap();
    out.extend(strings);
    out
}
