//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::compression::CompressionType;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// the container does not start with the expected magic
    #[error("bad magic: expected {expected:02X?}, found {found:02X?}")]
    #[diagnostic(code(eso_mnf::bad_magic))]
    BadMagic {
        expected: &'static [u8],
        found: Vec<u8>,
    },

    /// the container version is not supported
    #[error("unsupported manifest version {0}")]
    #[diagnostic(code(eso_mnf::bad_version))]
    BadVersion(u16),

    /// a block carries a type tag this reader does not understand
    #[error("unsupported block type {0}")]
    #[diagnostic(code(eso_mnf::unsupported_block_type))]
    UnsupportedBlockType(u16),

    /// fewer bytes remain than a read requested
    #[error("truncated read at {position:#x}: needed {needed} bytes, {available} available")]
    #[diagnostic(code(eso_mnf::truncated_read))]
    TruncatedRead {
        position: u64,
        needed: u64,
        available: u64,
    },

    /// a codec failed or produced the wrong number of bytes
    #[error("decompression failed: {0}")]
    #[diagnostic(code(eso_mnf::decompression_failed))]
    DecompressionFailed(String),

    /// the payload needs a codec that is not available
    #[error("unsupported codec for compression type {0}")]
    #[diagnostic(
        code(eso_mnf::codec_unsupported),
        help("entries packed with the LZ family need an LzDecompressor backend")
    )]
    CodecUnsupported(CompressionType),

    /// an entry points past the end of its shard
    #[error("entry spans {offset:#x}+{size:#x} but shard {archive_index} is {shard_len:#x} bytes")]
    #[diagnostic(code(eso_mnf::shard_bounds))]
    ShardBounds {
        archive_index: u8,
        offset: u64,
        size: u64,
        shard_len: u64,
    },

    /// the manifest has no entry for the name table key of its variant
    #[error("no name table entry with file index {0:#x}")]
    #[diagnostic(
        code(eso_mnf::name_table_pointer_missing),
        help("the manifest may belong to a different archive variant")
    )]
    NameTablePointerMissing(u32),

    /// the name table payload is malformed
    #[error("invalid name table: {0}")]
    #[diagnostic(code(eso_mnf::invalid_name_table))]
    InvalidNameTable(String),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

impl Error {
    /// Whether the error only concerns the entry being extracted, so a batch
    /// can skip that entry and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::IOError(_)
                | Error::TruncatedRead { .. }
                | Error::DecompressionFailed(_)
                | Error::CodecUnsupported(_)
                | Error::ShardBounds { .. }
        )
    }
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),

    /// by file index {0}
    #[error("by file index {0:#x}")]
    FileIndex(u32),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
