mod cli;

use clap::Parser;
use color_eyre::Result;
use localstash::{config, logging};

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = cli::Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override data dir if specified on command line
  let config = config::Config {
    data_dir_override: args.data_dir.clone(),
    ..config
  };

  let _log_guard = logging::init(&config)?;

  cli::run(args.command, &config).await
}
