use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;

use super::ArchiveArgs;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    archive: ArchiveArgs,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let (session, pool) = self.archive.open()?;
        let header = session.header();
        let stats = session.link_stats();

        println!("{:<16} {}", "variant".bold(), session.variant());
        println!("{:<16} {}", "version".bold(), header.version);
        println!("{:<16} {}", "index count".bold(), header.index_count);
        println!("{:<16} {:#x}", "data length".bold(), header.data_length);
        println!("{:<16} {:#x}", "table offset".bold(), header.block_offset);
        println!("{:<16} {}", "entries".bold(), session.len());
        println!("{:<16} {}", "shards".bold(), pool.source().directory.display());

        match session.name_table() {
            Some(names) => {
                println!("{:<16} {}", "names".bold(), names.len());
                println!("{:<16} {}", "linked".bold(), stats.linked.green());
                println!("{:<16} {}", "unnamed".bold(), stats.unnamed.yellow());
                println!("{:<16} {}", "filtered".bold(), stats.filtered);
                println!("{:<16} {}", "orphaned names".bold(), stats.orphaned_names);
                println!("{:<16} {}", "shared names".bold(), stats.shared_names);
            }
            None => println!("{:<16} {}", "names".bold(), "unavailable".red()),
        }

        Ok(())
    }
}
