use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;

use super::ArchiveArgs;

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// Only list entries whose name contains this text
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let (session, _) = self.archive.open()?;

        for entry in session.entries() {
            let name = entry.named_path();
            if let Some(filter) = &self.filter {
                if !name.as_deref().is_some_and(|n| n.contains(filter.as_str())) {
                    continue;
                }
            }

            let manifest = entry.manifest;
            let location = manifest.location.unwrap_or_default();
            print!(
                "{:>8} {:>4} {:>10} {:>10} {:>10} {:<8} ",
                manifest.index,
                location.archive_index,
                location.offset,
                location.compressed_size,
                location.size,
                location.compression_type.to_string(),
            );

            match name {
                Some(name) => println!("{name}"),
                None => println!("{}", "-".dimmed()),
            }
        }

        Ok(())
    }
}
