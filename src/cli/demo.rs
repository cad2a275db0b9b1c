//! The `demo` command: the classic walkthrough.
//!
//! Runs an amex query for two products, widens the product list (new cache
//! key, new fetch), then repeats it to show the hit path, and finishes with
//! store statistics.

use colored::Colorize;
use std::path::Path;
use std::time::Instant;

use crate::cache::CacheTtl;
use crate::error::Result;
use crate::filter::{FilterField, FilterSet};
use crate::output::OutputFormat;

use super::query::{build_cache, load_config};

pub async fn run(format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate_warehouse()?;
    let cache = build_cache(&config)?;
    // The walkthrough models someone watching a live dashboard
    let ttl = CacheTtl::INTERACTIVE;

    let filters = FilterSet::new()
        .with(FilterField::PaymentMethod, "amex")?
        .with_any_of(
            FilterField::Product,
            ["Golden Gate Ginger", "Tokyo Tidbits"],
        )?;

    let started = Instant::now();
    let first = cache.get(&filters, ttl).await?;
    println!(
        "{} first query fetched {} rows in {:?}",
        "miss".yellow().bold(),
        first.row_count(),
        started.elapsed()
    );

    // Widening the product list changes the key, so this is another miss
    let widened = filters.clone().with_any_of(
        FilterField::Product,
        ["Golden Gate Ginger", "Tokyo Tidbits", "Pearly Pies"],
    )?;
    let started = Instant::now();
    let second = cache.get(&widened, ttl).await?;
    println!(
        "{} widened filters fetched {} rows in {:?}",
        "miss".yellow().bold(),
        second.row_count(),
        started.elapsed()
    );

    let started = Instant::now();
    let third = cache.get(&widened, ttl).await?;
    println!(
        "{} repeat served {} rows from cache in {:?}",
        "hit".green().bold(),
        third.row_count(),
        started.elapsed()
    );

    let stats = cache.stats()?;
    println!();
    println!("Cache entries: {} live, {} expired", stats.live_entries, stats.expired_entries);
    println!("Cached rows:   {}", stats.total_rows);

    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&third.to_json_rows())?
        );
    }
    Ok(())
}
