//! Types for reading MNF archives
//!

use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
    sync::Arc,
};

use binrw::Endian;
use bon::Builder;
use tracing::{debug, info, instrument, warn};

use crate::{
    block::{read_block, read_table_body, Block, BLOCK_TYPE_TABLE},
    compression::{Decompressor, LzDecompressor},
    cursor::BinaryCursor,
    error::{Error, FileNotFoundError, Result},
    extract::{read_payload, ExtractedFile, ExtractionReport, ShardPool, ShardSource},
    link::{link, LinkStats, ResolvedEntry},
    manifest::ManifestTable,
    names::NameTable,
    sniff,
    types::{MNF_MAGIC, MNF_VERSION},
    variant::ArchiveVariant,
};

/// The fixed fields at the start of a manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArchiveHeader {
    pub version: u16,

    /// Entries in the index that follows the header, two bytes each
    pub index_count: u16,

    /// Opaque
    pub unknown: u32,

    /// Declared length of everything after the header
    pub data_length: u32,

    /// Absolute position of the table block's type tag
    pub block_offset: u64,
}

/// Read the header and the primary table of a manifest
///
/// A single type 0 block in front of the table is stepped over.
#[instrument(skip_all, err)]
pub fn read_manifest<R: Read + Seek>(reader: R) -> Result<(ArchiveHeader, ManifestTable)> {
    let mut cursor = BinaryCursor::new(reader)?;

    let magic = cursor.read_bytes(cursor.remaining().min(MNF_MAGIC.len() as u64))?;
    if magic != MNF_MAGIC {
        return Err(Error::BadMagic {
            expected: MNF_MAGIC,
            found: magic,
        });
    }

    let version = cursor.read_u16(Endian::Little)?;
    if version != MNF_VERSION {
        return Err(Error::BadVersion(version));
    }

    let index_count = cursor.read_u16(Endian::Little)?;
    cursor.skip(index_count as u64 * 2)?;
    let unknown = cursor.read_u32(Endian::Little)?;
    let data_length = cursor.read_u32(Endian::Little)?;

    let mut block_offset = cursor.position();
    let table = match read_block(&mut cursor)? {
        Block::Table(table) => table,
        Block::Skip => {
            block_offset = cursor.position();
            match cursor.read_u16(Endian::Big)? {
                BLOCK_TYPE_TABLE => read_table_body(&mut cursor)?,
                other => return Err(Error::UnsupportedBlockType(other)),
            }
        }
    };

    let header = ArchiveHeader {
        version,
        index_count,
        unknown,
        data_length,
        block_offset,
    };
    debug!("{header:?}");

    Ok((header, ManifestTable::from_block(&table)?))
}

/// Options for how an archive session is opened
#[derive(Clone, Builder)]
pub struct SessionOptions {
    /// The archive variant, guessed from the manifest path when unset
    pub variant: Option<ArchiveVariant>,

    /// Fail when the name table can not be loaded instead of going on without names
    #[builder(default = true)]
    pub require_names: bool,

    /// Backend for LZ packed entries
    pub lz: Option<Arc<dyn LzDecompressor>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions::builder().build()
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("variant", &self.variant)
            .field("require_names", &self.require_names)
            .field("lz", &self.lz.is_some())
            .finish()
    }
}

/// An opened manifest with its name table linked in
///
/// All records are owned by the session and read-only once it is built, so a
/// session can be shared between threads while each thread extracts through
/// its own [`ShardPool`].
///
/// ```no_run
/// use eso_mnf::{ArchiveSession, SessionOptions, ShardDirectory, ShardPool};
///
/// fn list(path: &str) -> eso_mnf::error::Result<()> {
///     let mut pool = ShardPool::new(ShardDirectory::for_manifest(path));
///     let session = ArchiveSession::open(path, &mut pool, SessionOptions::default())?;
///
///     for entry in session.entries() {
///         println!("{:>8} {}", entry.index(), entry.file_name().unwrap_or("-"));
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ArchiveSession {
    variant: ArchiveVariant,
    header: ArchiveHeader,
    manifest: ManifestTable,
    names: Option<NameTable>,
    links: Vec<Option<usize>>,
    link_stats: LinkStats,
    decompressor: Decompressor,
}

impl ArchiveSession {
    /// Open the manifest at `path`, reading its name table through `pool`
    pub fn open<S: ShardSource>(
        path: impl AsRef<Path>,
        pool: &mut ShardPool<S>,
        options: SessionOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let variant = options
            .variant
            .unwrap_or_else(|| ArchiveVariant::from_manifest_path(path));
        info!("opening {} as {variant} manifest", path.display());

        let reader = BufReader::new(File::open(path)?);
        Self::load(reader, pool, variant, options)
    }

    /// Read a manifest from any reader
    ///
    /// Without an explicit variant in `options` the manifest is read as a
    /// client manifest.
    pub fn new<R: Read + Seek, S: ShardSource>(
        reader: R,
        pool: &mut ShardPool<S>,
        options: SessionOptions,
    ) -> Result<Self> {
        let variant = options.variant.unwrap_or(ArchiveVariant::Client);
        Self::load(reader, pool, variant, options)
    }

    #[instrument(skip(reader, pool, options), err)]
    fn load<R: Read + Seek, S: ShardSource>(
        reader: R,
        pool: &mut ShardPool<S>,
        variant: ArchiveVariant,
        options: SessionOptions,
    ) -> Result<Self> {
        let (header, manifest) = read_manifest(reader)?;
        let decompressor = match options.lz {
            Some(lz) => Decompressor::with_lz(lz),
            None => Decompressor::new(),
        };

        let mut names = match Self::load_names(&manifest, pool, &decompressor, variant) {
            Ok(names) => Some(names),
            Err(e) if !options.require_names => {
                warn!("continuing without names: {e}");
                None
            }
            Err(e) => return Err(e),
        };

        let (links, link_stats) = match names {
            Some(ref mut names) => link(&manifest, names, variant),
            None => (
                vec![None; manifest.len()],
                LinkStats {
                    unnamed: manifest.len(),
                    ..Default::default()
                },
            ),
        };
        info!(
            "{} entries, {} named, {} unnamed, {} filtered",
            manifest.len(),
            link_stats.linked,
            link_stats.unnamed,
            link_stats.filtered
        );

        Ok(ArchiveSession {
            variant,
            header,
            manifest,
            names,
            links,
            link_stats,
            decompressor,
        })
    }

    fn load_names<S: ShardSource>(
        manifest: &ManifestTable,
        pool: &mut ShardPool<S>,
        decompressor: &Decompressor,
        variant: ArchiveVariant,
    ) -> Result<NameTable> {
        let key = variant.name_table_key();
        let entry = manifest
            .by_file_index(key)
            .ok_or(Error::NameTablePointerMissing(key))?;
        debug!("name table is entry {}", entry.index);

        let data = read_payload(entry, pool, decompressor, variant)?;
        NameTable::parse(&data)
    }

    pub fn variant(&self) -> ArchiveVariant {
        self.variant
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn manifest(&self) -> &ManifestTable {
        &self.manifest
    }

    /// The name table, absent when the session was opened without names
    pub fn name_table(&self) -> Option<&NameTable> {
        self.names.as_ref()
    }

    /// Whether the session had to go on without a name table
    pub fn is_degraded(&self) -> bool {
        self.names.is_none()
    }

    pub fn link_stats(&self) -> &LinkStats {
        &self.link_stats
    }

    /// Number of manifest entries
    pub fn len(&self) -> usize {
        self.manifest.len()
    }

    /// Whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entry at `position` with its name
    pub fn resolved(&self, position: usize) -> Option<ResolvedEntry<'_>> {
        let manifest = self.manifest.get(position)?;
        let name = self
            .links
            .get(position)
            .copied()
            .flatten()
            .and_then(|p| self.names.as_ref()?.get(p));

        Some(ResolvedEntry { manifest, name })
    }

    /// Every entry in manifest order
    pub fn entries(&self) -> impl Iterator<Item = ResolvedEntry<'_>> + '_ {
        (0..self.len()).filter_map(|position| self.resolved(position))
    }

    /// Get an entry by index
    pub fn by_index(&self, position: usize) -> Result<ResolvedEntry<'_>> {
        self.resolved(position)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(position)))
    }

    /// Search for an entry by its name, with or without the leading separator
    pub fn by_name(&self, name: &str) -> Result<ResolvedEntry<'_>> {
        let wanted = name.replace('\\', "/");
        let wanted = wanted.trim_start_matches('/');

        self.entries()
            .find(|e| e.named_path().is_some_and(|p| p == wanted))
            .ok_or_else(|| Error::FileNotFound(FileNotFoundError::Name(name.to_owned())))
    }

    /// Search for an entry by the key it shares with the name table
    pub fn by_file_index(&self, file_index: u32) -> Result<ResolvedEntry<'_>> {
        self.manifest
            .by_file_index(file_index)
            .and_then(|e| self.resolved(e.index as usize))
            .ok_or(Error::FileNotFound(FileNotFoundError::FileIndex(file_index)))
    }

    /// Read, decompress and place one entry
    #[instrument(skip_all, fields(index = entry.index()), err)]
    pub fn extract<S: ShardSource>(
        &self,
        entry: ResolvedEntry<'_>,
        pool: &mut ShardPool<S>,
    ) -> Result<ExtractedFile> {
        let data = read_payload(entry.manifest, pool, &self.decompressor, self.variant)?;

        let relative_path = entry.relative_path(&data);
        let extension = match relative_path.rsplit_once('.') {
            Some((stem, extension)) if !stem.ends_with('/') && !extension.contains('/') => {
                extension.to_ascii_lowercase()
            }
            _ => sniff::guess_extension(&data).to_owned(),
        };

        Ok(ExtractedFile {
            index: entry.index(),
            relative_path,
            extension,
            data,
        })
    }

    /// Extract every entry, handing each file to `visit`
    ///
    /// A failing entry, or a failing `visit`, is logged and recorded in the
    /// report and the batch moves on.
    pub fn extract_all<S, F>(&self, pool: &mut ShardPool<S>, visit: F) -> ExtractionReport
    where
        S: ShardSource,
        F: FnMut(ExtractedFile) -> Result<()>,
    {
        self.extract_many(self.entries(), pool, visit)
    }

    /// Extract a chosen set of entries, see [`ArchiveSession::extract_all`]
    #[instrument(skip_all)]
    pub fn extract_many<'s, I, S, F>(
        &'s self,
        entries: I,
        pool: &mut ShardPool<S>,
        mut visit: F,
    ) -> ExtractionReport
    where
        I: IntoIterator<Item = ResolvedEntry<'s>>,
        S: ShardSource,
        F: FnMut(ExtractedFile) -> Result<()>,
    {
        let mut report = ExtractionReport::default();

        for entry in entries {
            let index = entry.index();
            match self.extract(entry, pool).and_then(&mut visit) {
                Ok(()) => report.extracted += 1,
                Err(e) => {
                    warn!("skipping entry {index}: {e}");
                    report.failed.push((index, e));
                }
            }
        }

        info!("{}", report.summary());
        report
    }

    /// Extract every entry on the rayon thread pool
    ///
    /// Each worker opens its own shard handles from a clone of `source`.
    #[cfg(feature = "parallel")]
    #[instrument(skip_all)]
    pub fn extract_all_parallel<S, F>(&self, source: S, visit: F) -> ExtractionReport
    where
        S: ShardSource + Clone + Send + Sync,
        F: Fn(ExtractedFile) -> Result<()> + Send + Sync,
    {
        use rayon::prelude::*;

        let mut report = (0..self.len())
            .into_par_iter()
            .map_init(
                || ShardPool::new(source.clone()),
                |pool, position| {
                    let result = self
                        .by_index(position)
                        .and_then(|entry| self.extract(entry, pool))
                        .and_then(&visit);
                    (position as u32, result)
                },
            )
            .fold(ExtractionReport::default, |mut report, (index, result)| {
                match result {
                    Ok(()) => report.extracted += 1,
                    Err(e) => {
                        warn!("skipping entry {index}: {e}");
                        report.failed.push((index, e));
                    }
                }
                report
            })
            .reduce(ExtractionReport::default, |mut left, right| {
                left.merge(right);
                left
            });

        report.failed.sort_by_key(|(index, _)| *index);
        info!("{}", report.summary());
        report
    }
}
