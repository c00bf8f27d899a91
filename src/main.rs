use anyhow::{Context, Result};
use bridge_shell::cli::{self, Cli};
use bridge_shell::{HttpFetcher, ShellSettings};
use clap::Parser;
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = ShellSettings::load_with_env(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }

    // Initialize logger to file (truncate on each run)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&settings.log_file)
        .with_context(|| format!("Failed to open log file: {:?}", settings.log_file))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Starting bridge-shell against {}", settings.base_url);
    let fetcher = HttpFetcher::new(&settings)?;

    cli::repl::run(Arc::new(fetcher), &settings.base_url, &cli.path).await
}
