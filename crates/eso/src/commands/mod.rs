pub mod mnf;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle MNF manifests and their DAT shards
    Mnf {
        #[command(subcommand)]
        command: mnf::MnfCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Mnf { command } => command.handle(),
        }
    }
}
