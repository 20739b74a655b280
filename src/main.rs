use clap::Parser;

use meeting_store::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.store_config()?;
    meeting_store::init_logging(&config.log_level);

    log::debug!("Using database at {:?}", config.database_path);
    cli::run(&cli, &config)
}
