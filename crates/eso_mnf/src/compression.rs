//! Payload decompression and codec dispatch.

use std::{fmt, io::Read, sync::Arc};

use flate2::read::ZlibDecoder;
use tracing::{instrument, trace, warn};

use crate::error::{Error, Result};

/// Leading bytes that mark a payload packed with the proprietary LZ family
pub const LZ_MAGICS: [[u8; 2]; 4] = [[0x8C, 0x05], [0x8C, 0x06], [0x8C, 0x0A], [0x8C, 0x0C]];

/// Leading bytes of a zlib stream at the default compression level
pub const ZLIB_MAGIC: [u8; 2] = [0x78, 0x9C];

/// Compression method declared by a manifest record
///
/// The declaration is only a hint: the payload's leading bytes are checked
/// first, see [`Decompressor::decompress`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CompressionType {
    /// Detect the codec from the payload
    #[default]
    Auto,

    /// Always inflate with zlib
    Deflate,

    /// Snappy class codec, never attempted
    Snappy,

    /// A value with no known meaning
    Unknown(u8),
}

impl From<u8> for CompressionType {
    fn from(value: u8) -> Self {
        match value {
            0 => CompressionType::Auto,
            1 => CompressionType::Deflate,
            2 => CompressionType::Snappy,
            other => CompressionType::Unknown(other),
        }
    }
}

impl From<CompressionType> for u8 {
    fn from(value: CompressionType) -> Self {
        match value {
            CompressionType::Auto => 0,
            CompressionType::Deflate => 1,
            CompressionType::Snappy => 2,
            CompressionType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionType::Auto => write!(f, "auto"),
            CompressionType::Deflate => write!(f, "deflate"),
            CompressionType::Snappy => write!(f, "snappy"),
            CompressionType::Unknown(value) => write!(f, "unknown({value})"),
        }
    }
}

/// Backend for the proprietary LZ family
///
/// The codec does not terminate on its own: `output` is already sized to the
/// declared decompressed length and the implementation returns how many bytes
/// it produced.
pub trait LzDecompressor: Send + Sync {
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> std::io::Result<usize>;
}

/// Codec picked for a payload by [`Decompressor::detect`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Codec {
    Lz,
    Zlib,
    Unsupported,
    Raw,
}

/// Picks and runs the codec for a payload
#[derive(Clone, Default)]
pub struct Decompressor {
    lz: Option<Arc<dyn LzDecompressor>>,
}

impl fmt::Debug for Decompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decompressor")
            .field("lz", &self.lz.is_some())
            .finish()
    }
}

impl Decompressor {
    /// A decompressor without an LZ backend
    pub fn new() -> Self {
        Self::default()
    }

    /// A decompressor that hands LZ payloads to `lz`
    pub fn with_lz(lz: Arc<dyn LzDecompressor>) -> Self {
        Decompressor { lz: Some(lz) }
    }

    /// Whether an LZ backend is configured
    pub fn has_lz(&self) -> bool {
        self.lz.is_some()
    }

    /// Decide how a payload is stored
    ///
    /// Magic bytes win over the declared type, in this order: LZ family, zlib
    /// header, declared deflate, declared snappy, raw.
    pub fn detect(data: &[u8], declared: CompressionType) -> Codec {
        let prefix = data.get(..2);

        if prefix.is_some_and(|p| LZ_MAGICS.iter().any(|m| m == p)) {
            Codec::Lz
        } else if prefix == Some(&ZLIB_MAGIC[..]) {
            Codec::Zlib
        } else {
            match declared {
                CompressionType::Deflate => Codec::Zlib,
                CompressionType::Snappy => Codec::Unsupported,
                _ => Codec::Raw,
            }
        }
    }

    /// Decompress a payload to exactly `size` bytes
    #[instrument(skip(self, data), fields(len = data.len()), err)]
    pub fn decompress(&self, data: &[u8], size: usize, declared: CompressionType) -> Result<Vec<u8>> {
        if let CompressionType::Unknown(value) = declared {
            warn!("unknown compression type {value}, detecting codec from payload");
        }

        match Self::detect(data, declared) {
            Codec::Lz => self.decompress_lz(data, size),
            Codec::Zlib => Self::inflate(data, size),
            Codec::Unsupported => Err(Error::CodecUnsupported(declared)),
            Codec::Raw => {
                check_size(data.len(), size)?;
                Ok(data.to_vec())
            }
        }
    }

    /// Inflate a zlib stream that must produce exactly `size` bytes
    pub fn inflate(data: &[u8], size: usize) -> Result<Vec<u8>> {
        trace!("inflating {} bytes into {size}", data.len());

        let capacity = size.min(data.len().saturating_mul(MAX_INFLATE_RATIO));
        let mut output = Vec::with_capacity(capacity);
        ZlibDecoder::new(data)
            // one byte of slack so an overlong stream is noticed without inflating all of it
            .take(size as u64 + 1)
            .read_to_end(&mut output)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

        check_size(output.len(), size)?;
        Ok(output)
    }

    fn decompress_lz(&self, data: &[u8], size: usize) -> Result<Vec<u8>> {
        let Some(lz) = &self.lz else {
            return Err(Error::CodecUnsupported(CompressionType::Auto));
        };

        let mut output = vec![0u8; size];
        let written = lz
            .decompress(data, &mut output)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

        check_size(written, size)?;
        Ok(output)
    }
}

/// Upper bound of the deflate expansion ratio
const MAX_INFLATE_RATIO: usize = 1032;

fn check_size(actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::DecompressionFailed(format!(
            "expected {expected} bytes, produced {actual}"
        )));
    }
    Ok(())
}
