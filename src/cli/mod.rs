//! CLI command definitions and handlers

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod demo;
pub mod query;

use crate::output::OutputFormat;

/// salescache - cached sales queries against the warehouse
#[derive(Parser, Debug)]
#[command(name = "salescache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "SALESCACHE_FORMAT",
        default_value = "table",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "SALESCACHE_CONFIG", hide_env = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "SALESCACHE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a filtered sales query through the cache
    Query(QueryArgs),

    /// Replay the caching walkthrough: fetch, refine filters, observe hits
    Demo,

    /// Display version information
    Version,
}

/// Arguments for the `query` command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Filter as name=value or name=v1,v2 (repeatable).
    /// Names: city, country, payment_method, product, size.
    #[arg(short = 'f', long = "filter")]
    pub filters: Vec<String>,

    /// TTL in seconds for the cached result (default from config)
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Run the query this many times to observe cache hits
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}
