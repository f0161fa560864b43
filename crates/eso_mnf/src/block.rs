//! Tagged blocks and the tri-stream table decoder.

use std::io::{Read, Seek};

use binrw::Endian;
use tracing::{debug, instrument, trace};

use crate::{
    compression::Decompressor,
    cursor::BinaryCursor,
    error::{Error, Result},
    types::{SubStreamHeader, TableBlockHeader},
};

/// Type tag of a block whose payload is skipped
pub const BLOCK_TYPE_SKIP: u16 = 0;

/// Type tag of a tri-stream table block
pub const BLOCK_TYPE_TABLE: u16 = 3;

/// Bytes stepped over in place of the sub-streams of an empty nested block
pub const EMPTY_NESTED_BLOCK_SKIP: u64 = 8;

const SKIP_BLOCK_PAYLOADS: usize = 2;

/// A block read from a manifest
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Payload format unsupported, consumed and discarded
    Skip,

    /// A decoded tri-stream table
    Table(TableBlock),
}

/// A table block with its three sub-streams decompressed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableBlock {
    pub header: TableBlockHeader,
    pub streams: [Vec<u8>; 3],
}

impl TableBlock {
    pub fn record23_count(&self) -> u32 {
        self.header.record23_count
    }

    /// Whether the block was absent from a nested table
    pub fn is_empty(&self) -> bool {
        self.header.record23_count == 0 && self.streams.iter().all(Vec::is_empty)
    }

    pub fn stream(&self, index: usize) -> &[u8] {
        &self.streams[index]
    }

    /// Decompressed bytes across all three sub-streams
    pub fn stream_len(&self) -> usize {
        self.streams.iter().map(Vec::len).sum()
    }
}

/// Read a block type tag followed by its payload
#[instrument(skip(cursor), fields(position = cursor.position()), err)]
pub fn read_block<R: Read + Seek>(cursor: &mut BinaryCursor<R>) -> Result<Block> {
    match cursor.read_u16(Endian::Big)? {
        BLOCK_TYPE_SKIP => {
            skip_block_payload(cursor)?;
            Ok(Block::Skip)
        }
        BLOCK_TYPE_TABLE => Ok(Block::Table(read_table_body(cursor)?)),
        other => Err(Error::UnsupportedBlockType(other)),
    }
}

/// Step over the body of a type 0 block
///
/// The body is an opaque word followed by two size-prefixed payloads in a
/// format this reader does not decode.
pub fn skip_block_payload<R: Read + Seek>(cursor: &mut BinaryCursor<R>) -> Result<()> {
    debug!("skipping type 0 block at {:#x}", cursor.position());

    cursor.read_u16(Endian::Little)?;
    for _ in 0..SKIP_BLOCK_PAYLOADS {
        let size = cursor.read_u32(Endian::Big)?;
        cursor.skip(size as u64)?;
    }
    Ok(())
}

/// Decode the body of a table block, after its type tag
pub fn read_table_body<R: Read + Seek>(cursor: &mut BinaryCursor<R>) -> Result<TableBlock> {
    let header: TableBlockHeader = cursor.read_struct()?;
    debug!(
        "table block: 1a={} 1b={} 23={}",
        header.record1a_count, header.record1b_count, header.record23_count
    );

    Ok(TableBlock {
        header,
        streams: [
            read_sub_stream(cursor)?,
            read_sub_stream(cursor)?,
            read_sub_stream(cursor)?,
        ],
    })
}

/// Decode a table block nested inside a name table
///
/// A nested block with no records carries no sub-streams, only a fixed amount
/// of padding that is skipped.
#[instrument(skip(cursor), fields(position = cursor.position()), err)]
pub fn read_nested_table<R: Read + Seek>(cursor: &mut BinaryCursor<R>) -> Result<TableBlock> {
    let tag = cursor.read_u16(Endian::Big)?;
    if tag != BLOCK_TYPE_TABLE {
        return Err(Error::InvalidNameTable(format!(
            "nested block has type {tag}"
        )));
    }

    let header: TableBlockHeader = cursor.read_struct()?;
    if header.record23_count == 0 {
        debug!("nested block is empty");
        cursor.skip(EMPTY_NESTED_BLOCK_SKIP)?;
        return Ok(TableBlock {
            header,
            ..Default::default()
        });
    }

    Ok(TableBlock {
        header,
        streams: [
            read_sub_stream(cursor)?,
            read_sub_stream(cursor)?,
            read_sub_stream(cursor)?,
        ],
    })
}

/// Read one size-prefixed zlib sub-stream
///
/// Sub-streams are always zlib, whatever the entry level compression rules say.
fn read_sub_stream<R: Read + Seek>(cursor: &mut BinaryCursor<R>) -> Result<Vec<u8>> {
    let sizes: SubStreamHeader = cursor.read_struct()?;
    trace!(
        "sub-stream at {:#x}: {} -> {} bytes",
        cursor.position(),
        sizes.compressed_size,
        sizes.decompressed_size
    );

    let compressed = cursor.read_bytes(sizes.compressed_size as u64)?;
    Decompressor::inflate(&compressed, sizes.decompressed_size as usize)
}
