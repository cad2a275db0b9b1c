//! The `query` command: run a filtered sales query through the cache

use colored::Colorize;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::cache::{LocalStore, QueryCache};
use crate::cli::QueryArgs;
use crate::config::Config;
use crate::error::Result;
use crate::filter::FilterSet;
use crate::output::{self, OutputFormat};
use crate::warehouse::WarehouseClient;

pub async fn run(args: QueryArgs, format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    // Filter validation comes first; a bad filter never costs a connection
    let mut filters = FilterSet::new();
    for entry in &args.filters {
        filters.apply_entry(entry)?;
    }
    config.validate_warehouse()?;

    let cache = build_cache(&config)?;
    let ttl = Duration::from_secs(args.ttl.unwrap_or(config.cache.default_ttl_secs));

    let mut last = None;
    for run in 1..=args.repeat.max(1) {
        let started = Instant::now();
        let result = cache.get(&filters, ttl).await?;
        if args.repeat > 1 {
            eprintln!(
                "{} run {} returned {} rows in {:?}",
                "salescache:".dimmed(),
                run,
                result.row_count(),
                started.elapsed()
            );
        }
        last = Some(result);
    }

    if let Some(result) = last {
        println!("{}", output::render(&result, format)?);
        if format == OutputFormat::Table {
            eprintln!("{}", format!("{} rows", result.row_count()).dimmed());
        }
    }
    Ok(())
}

pub(crate) fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

pub(crate) fn build_cache(config: &Config) -> Result<QueryCache<WarehouseClient>> {
    let client = WarehouseClient::new(&config.warehouse)?;
    let store = match config.cache.max_entries {
        Some(max) => LocalStore::with_capacity(max)?,
        None => LocalStore::open_in_memory()?,
    };
    Ok(QueryCache::with_store(
        client,
        config.cache.context.clone(),
        store,
    ))
}
