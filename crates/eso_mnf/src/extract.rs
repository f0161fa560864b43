//! Reading entry payloads out of the `.dat` shards.

use std::{
    collections::{hash_map::Entry, BTreeMap, HashMap},
    fmt,
    fs::File,
    io::{BufReader, Cursor, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use tracing::{debug, instrument, trace};

use crate::{
    compression::Decompressor,
    error::{Error, Result},
    manifest::ManifestEntry,
    sniff::GEOMETRY_EXTENSION,
    types::ZOSFT_MAGIC,
    variant::ArchiveVariant,
};

/// Length words in front of a client payload
const PAYLOAD_HEADER_WORDS: usize = 2;

/// Opens the shard with a given archive index
pub trait ShardSource {
    type Reader: Read + Seek;

    fn open(&self, archive_index: u8) -> Result<Self::Reader>;
}

/// Shards stored as files next to each other
///
/// Shard `n` is read from `{directory}/{prefix}{n:04}.dat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardDirectory {
    pub directory: PathBuf,
    pub prefix: String,
}

impl ShardDirectory {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        ShardDirectory {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    /// The shards that sit beside a manifest and share its stem,
    /// `game.mnf` pairs with `game0000.dat`
    pub fn for_manifest(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let prefix = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        ShardDirectory { directory, prefix }
    }

    pub fn shard_path(&self, archive_index: u8) -> PathBuf {
        self.directory
            .join(format!("{}{:04}.dat", self.prefix, archive_index))
    }
}

impl ShardSource for ShardDirectory {
    type Reader = BufReader<File>;

    fn open(&self, archive_index: u8) -> Result<Self::Reader> {
        let path = self.shard_path(archive_index);
        debug!("opening shard {}", path.display());
        Ok(BufReader::new(File::open(path)?))
    }
}

/// Shards held in memory
impl<'a> ShardSource for &'a BTreeMap<u8, Vec<u8>> {
    type Reader = Cursor<&'a [u8]>;

    fn open(&self, archive_index: u8) -> Result<Self::Reader> {
        let shards: &'a BTreeMap<u8, Vec<u8>> = self;
        shards
            .get(&archive_index)
            .map(|data| Cursor::new(data.as_slice()))
            .ok_or_else(|| {
                Error::IOError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no shard with archive index {archive_index}"),
                ))
            })
    }
}

struct OpenShard<R> {
    reader: R,
    len: u64,
}

/// Keeps one open reader per shard
///
/// Owned by whoever is extracting; handles are closed when the pool is dropped.
pub struct ShardPool<S: ShardSource> {
    source: S,
    shards: HashMap<u8, OpenShard<S::Reader>>,
}

impl<S: ShardSource + fmt::Debug> fmt::Debug for ShardPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardPool")
            .field("source", &self.source)
            .field("open", &self.shards.len())
            .finish()
    }
}

impl<S: ShardSource> ShardPool<S> {
    pub fn new(source: S) -> Self {
        ShardPool {
            source,
            shards: HashMap::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of shards opened so far
    pub fn open_count(&self) -> usize {
        self.shards.len()
    }

    /// Read `size` bytes at `offset` from a shard, opening it on first use
    pub fn read_range(&mut self, archive_index: u8, offset: u64, size: u64) -> Result<Vec<u8>> {
        let shard = match self.shards.entry(archive_index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut reader = self.source.open(archive_index)?;
                let len = reader.seek(SeekFrom::End(0))?;
                trace!("shard {archive_index} is {len} bytes");
                entry.insert(OpenShard { reader, len })
            }
        };

        let in_bounds = offset
            .checked_add(size)
            .is_some_and(|end| end <= shard.len);
        if !in_bounds {
            return Err(Error::ShardBounds {
                archive_index,
                offset,
                size,
                shard_len: shard.len,
            });
        }

        let mut data = vec![0u8; size as usize];
        shard.reader.seek(SeekFrom::Start(offset))?;
        shard.reader.read_exact(&mut data)?;
        Ok(data)
    }
}

/// Read and decompress the stored bytes of one entry
///
/// Client payloads also lose their embedded header here.
#[instrument(skip_all, fields(index = entry.index), err)]
pub fn read_payload<S: ShardSource>(
    entry: &ManifestEntry,
    pool: &mut ShardPool<S>,
    decompressor: &Decompressor,
    variant: ArchiveVariant,
) -> Result<Vec<u8>> {
    let location = entry.location.ok_or_else(|| {
        Error::CustomError(format!("entry {} has no storage record", entry.index))
    })?;

    let stored = pool.read_range(
        location.archive_index,
        location.offset as u64,
        location.compressed_size as u64,
    )?;
    let data = decompressor.decompress(
        &stored,
        location.size as usize,
        location.compression_type,
    )?;

    if variant.has_payload_header() {
        strip_payload_header(data)
    } else {
        Ok(data)
    }
}

/// Drop the header in front of a client payload
///
/// The header is two length-prefixed fields. Name table payloads have no header
/// and are returned untouched.
pub fn strip_payload_header(mut data: Vec<u8>) -> Result<Vec<u8>> {
    if data.starts_with(ZOSFT_MAGIC) {
        return Ok(data);
    }

    let mut position = 0usize;
    for _ in 0..PAYLOAD_HEADER_WORDS {
        let word = data
            .get(position..position + 4)
            .ok_or_else(|| truncated(position, 4, data.len()))?;
        let length = u32::from_le_bytes([word[0], word[1], word[2], word[3]]) as usize;

        position = position
            .checked_add(4 + length)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| truncated(position + 4, length, data.len()))?;
    }

    trace!("payload header is {position} bytes");
    data.drain(..position);
    Ok(data)
}

fn truncated(position: usize, needed: usize, len: usize) -> Error {
    Error::TruncatedRead {
        position: position as u64,
        needed: needed as u64,
        available: len.saturating_sub(position) as u64,
    }
}

/// One entry's content together with where it belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Position of the entry in the manifest
    pub index: u32,

    /// Path relative to the output directory, always `/` separated
    pub relative_path: String,

    pub extension: String,

    pub data: Vec<u8>,
}

impl ExtractedFile {
    /// Whether this is model data for a mesh exporter
    pub fn is_geometry(&self) -> bool {
        self.extension.eq_ignore_ascii_case(GEOMETRY_EXTENSION)
    }
}

/// Outcome of extracting many entries
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub extracted: usize,

    /// Entry index and cause of every failure
    pub failed: Vec<(u32, Error)>,
}

impl ExtractionReport {
    /// Whether every entry made it
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} extracted, {} failed",
            self.extracted,
            self.failed.len()
        )
    }

    pub(crate) fn merge(&mut self, other: ExtractionReport) {
        self.extracted += other.extracted;
        self.failed.extend(other.failed);
    }
}
