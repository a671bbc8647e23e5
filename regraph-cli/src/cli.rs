use crate::commands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "regraph",
    about = "resolve, flatten and preview registry components",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Serve components from a JSON fixture instead of the registry
    #[arg(long, global = true, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the dependency tree of a component
    Resolve(commands::resolve::ResolveArgs),
    /// List every component a component depends on, once
    Flatten(commands::flatten::FlattenArgs),
    /// Assemble the sandbox files for a live preview
    Preview(commands::preview::PreviewArgs),
    /// Show the resolved configuration
    Config(commands::config::ConfigArgs),
}
