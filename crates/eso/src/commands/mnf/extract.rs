use clap::Args;
use miette::{miette, Result};
use std::{fs::File, io::Write, path::PathBuf};
use tracing::{debug, error, info};

use super::ArchiveArgs;

#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Only extract entries whose name contains this text
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let (session, mut pool) = self.archive.open()?;

        let entries = session.entries().filter(|entry| match &self.filter {
            Some(filter) => entry
                .named_path()
                .is_some_and(|n| n.contains(filter.as_str())),
            None => true,
        });

        let report = session.extract_many(entries, &mut pool, |file| {
            let p = self.directory.join(&file.relative_path);
            debug!("writing {}", p.display());

            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = if !self.overwrite {
                File::create_new(&p)?
            } else {
                File::create(&p)?
            };
            out.write_all(&file.data)?;
            Ok(())
        });

        for (index, e) in &report.failed {
            error!("entry {index}: {e}");
        }
        info!("{}", report.summary());

        if report.is_complete() {
            Ok(())
        } else {
            Err(miette!("{} entries could not be extracted", report.failed.len()))
        }
    }
}
