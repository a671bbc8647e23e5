use anyhow::{Context, Result};
use clap::Parser;
use regraph_core::registry::build_client;
use regraph_core::{
    ArtifactFetcher, ComponentLookup, HttpFetcher, HttpRegistry, MemoryRegistry, RegraphConfig,
};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = RegraphConfig::from_env();
    if args.verbose {
        config.verbose = true;
    }

    init_tracing(&config)?;

    if let Command::Config(config_args) = args.command {
        return commands::config::run(config_args, &config).await;
    }

    match &args.fixture {
        Some(path) => {
            let registry = MemoryRegistry::from_fixture(path)
                .with_context(|| format!("loading fixture {}", path.display()))?;
            tracing::debug!(components = registry.len(), "using fixture registry");
            dispatch(args.command, &config, &registry, &registry).await
        }
        None => {
            let client = build_client()?;
            let registry = HttpRegistry::new(&config, client.clone());
            let fetcher = HttpFetcher::new(client);
            dispatch(args.command, &config, &registry, &fetcher).await
        }
    }
}

async fn dispatch<L, F>(
    command: Command,
    config: &RegraphConfig,
    lookup: &L,
    fetcher: &F,
) -> Result<()>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    match command {
        Command::Resolve(args) => commands::resolve::run(args, config, lookup, fetcher).await,
        Command::Flatten(args) => commands::flatten::run(args, config, lookup, fetcher).await,
        Command::Preview(args) => commands::preview::run(args, config, lookup, fetcher).await,
        Command::Config(args) => commands::config::run(args, config).await,
    }
}

fn init_tracing(config: &RegraphConfig) -> Result<()> {
    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
