use clap::{Args, ValueEnum};
use eso_mnf::table::{ManifestRow, NameRow};
use miette::{miette, IntoDiagnostic, Result};

use super::ArchiveArgs;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Source {
    /// One row per manifest entry
    #[default]
    Manifest,
    /// One row per name table record
    Names,
}

#[derive(Args)]
pub struct TableArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// Which table to dump
    #[arg(long, value_enum, default_value_t = Source::Manifest)]
    source: Source,
}

impl TableArgs {
    pub fn handle(&self) -> Result<()> {
        let (session, _) = self.archive.open()?;
        let stdout = std::io::stdout().lock();

        match self.source {
            Source::Manifest => {
                let rows: Vec<ManifestRow> = session.entries().map(ManifestRow::from).collect();
                serde_json::to_writer_pretty(stdout, &rows).into_diagnostic()?;
            }
            Source::Names => {
                let names = session
                    .name_table()
                    .ok_or(miette!("the name table could not be read"))?;
                let rows: Vec<NameRow> = names.entries().iter().map(NameRow::from).collect();
                serde_json::to_writer_pretty(stdout, &rows).into_diagnostic()?;
            }
        }

        println!();
        Ok(())
    }
}
