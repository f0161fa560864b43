pub mod extract;
pub mod info;
pub mod list;
pub mod table;

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use eso_mnf::{ArchiveSession, ArchiveVariant, SessionOptions, ShardDirectory, ShardPool};
use miette::{Context, Result};

#[derive(clap::Subcommand)]
pub enum MnfCommands {
    /// Show the header and link statistics of a manifest
    Info(info::InfoArgs),
    /// List every entry of a manifest
    List(list::ListArgs),
    /// Extract every entry of a manifest into a directory
    Extract(extract::ExtractArgs),
    /// Dump the manifest or name table as JSON rows
    Table(table::TableArgs),
}

impl MnfCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            MnfCommands::Info(info) => info.handle(),
            MnfCommands::List(list) => list.handle(),
            MnfCommands::Extract(extract) => extract.handle(),
            MnfCommands::Table(table) => table.handle(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Variant {
    Depot,
    Client,
}

impl From<Variant> for ArchiveVariant {
    fn from(value: Variant) -> Self {
        match value {
            Variant::Depot => ArchiveVariant::Depot,
            Variant::Client => ArchiveVariant::Client,
        }
    }
}

/// Arguments shared by every command that opens a manifest
#[derive(Args)]
pub struct ArchiveArgs {
    /// An input MNF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The directory holding the DAT shards, defaults to the manifest's directory
    #[arg(long, value_name = "DIR")]
    shard_dir: Option<PathBuf>,

    /// The shard file name prefix, defaults to the manifest's file stem
    #[arg(long, value_name = "PREFIX")]
    shard_prefix: Option<String>,

    /// The manifest variant, guessed from the file name when omitted
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Keep going without file names when the name table can not be read
    #[arg(long, default_value_t = false)]
    allow_unnamed: bool,
}

impl ArchiveArgs {
    fn shards(&self) -> ShardDirectory {
        let mut shards = ShardDirectory::for_manifest(&self.file);
        if let Some(directory) = &self.shard_dir {
            shards.directory = directory.clone();
        }
        if let Some(prefix) = &self.shard_prefix {
            shards.prefix = prefix.clone();
        }
        shards
    }

    /// Open the session along with the shard pool it was read through
    pub fn open(&self) -> Result<(ArchiveSession, ShardPool<ShardDirectory>)> {
        let mut pool = ShardPool::new(self.shards());

        let options = SessionOptions::builder()
            .maybe_variant(self.variant.map(ArchiveVariant::from))
            .require_names(!self.allow_unnamed)
            .build();

        let session = ArchiveSession::open(&self.file, &mut pool, options)
            .context(format!("path: {}", self.file.display()))?;

        Ok((session, pool))
    }
}
