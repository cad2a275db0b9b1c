//! salescache CLI - cached sales queries against the warehouse

use clap::Parser;
use colored::Colorize;

use salescache::cli::{self, Cli, Commands};
use salescache::error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.debug { "salescache=debug" } else { "warn" },
    ))
    .init();

    if let Err(err) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Query(args) => cli::query::run(args, cli.format, cli.config.as_deref()).await,
        Commands::Demo => cli::demo::run(cli.format, cli.config.as_deref()).await,
        Commands::Version => {
            println!("salescache version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
