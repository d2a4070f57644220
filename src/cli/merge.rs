//! The `merge` subcommand and the load-and-merge stage shared with full runs

use std::path::Path;

use anyhow::Result;
use console::style;
use polars::prelude::DataFrame;

use super::args::SourcePaths;
use crate::pipeline::{load_deaths, load_gdp, load_population, merge_sources, MergeStats, WideLoadOptions};
use crate::report::write_maindata;
use crate::utils::{create_spinner, finish_with_success};

/// Load the three sources and merge them into the regression table
pub fn load_and_merge(sources: &SourcePaths, options: &WideLoadOptions) -> Result<(DataFrame, MergeStats)> {
    let spinner = create_spinner("Loading HIV deaths...");
    let deaths = load_deaths(&sources.deaths)?;
    finish_with_success(&spinner, &format!("Loaded {} death records", deaths.height()));

    let spinner = create_spinner("Loading GDP per capita...");
    let gdp = load_gdp(&sources.gdp, options)?;
    finish_with_success(&spinner, &format!("Loaded {} GDP country-years", gdp.height()));

    let spinner = create_spinner("Loading population...");
    let population = load_population(&sources.population, options)?;
    finish_with_success(
        &spinner,
        &format!("Loaded {} population country-years", population.height()),
    );

    let spinner = create_spinner("Merging sources...");
    let (maindata, stats) = merge_sources(&gdp, &population, &deaths)?;
    finish_with_success(&spinner, &format!("Merged table has {} rows", maindata.height()));

    Ok((maindata, stats))
}

/// Run the merge-only pipeline, writing the merged table to `output`
pub fn run_merge(sources: &SourcePaths, options: &WideLoadOptions, output: &Path) -> Result<()> {
    println!("\n {} Merging HIV deaths, GDP and population", style("◆").cyan().bold());
    println!("   Deaths:     {}", style(sources.deaths.display()).dim());
    println!("   GDP:        {}", style(sources.gdp.display()).dim());
    println!("   Population: {}", style(sources.population.display()).dim());
    println!("   Output:     {}", style(output.display()).dim());
    println!();

    let (mut maindata, stats) = load_and_merge(sources, options)?;

    let spinner = create_spinner("Writing merged table...");
    write_maindata(&mut maindata, output)?;
    finish_with_success(&spinner, &format!("Saved to {}", output.display()));

    println!();
    println!(
        "   {} rows, {} country-years without death records",
        style(stats.maindata_rows).yellow().bold(),
        style(stats.unmatched_country_years).yellow()
    );
    println!();

    Ok(())
}
