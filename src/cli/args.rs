//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{init::InitArgs, list::ListArgs, status::StatusArgs};

#[derive(Parser)]
#[command(name = "hospital")]
#[command(author, version, about = "Hospital records store")]
#[command(long_about = "Bootstraps the hospital records database from CSV data and inspects its contents.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Database file (overrides HOSPITAL_DB_PATH and the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the schema, load the data and classify subclasses
    Init(InitArgs),

    /// Show row counts for every table
    Status(StatusArgs),

    /// List the records of one entity
    List(ListArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Markdown table
    #[default]
    Table,
    /// JSON array (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
}
