//! Output files: the merged table as CSV and model results as JSON

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use super::histogram::Histogram;
use crate::model::{AnovaComparison, ModelFit};
use crate::pipeline::{MergeStats, ZeroMortalityPolicy};

/// Default name of the merged-table output
pub const MAINDATA_FILE: &str = "maindata.csv";

/// Default name of the model results output
pub const RESULTS_FILE: &str = "model_results.json";

/// Metadata about the run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub hivstat_version: String,
    pub deaths_file: String,
    pub gdp_file: String,
    pub population_file: String,
    pub header_rows: usize,
    pub first_year: i64,
    pub last_year: i64,
    pub zero_mortality_policy: ZeroMortalityPolicy,
}

/// A model that could not be fitted
#[derive(Serialize)]
pub struct FailedModel {
    pub name: String,
    pub error: String,
}

/// Complete results export
#[derive(Serialize)]
pub struct ResultsExport<'a> {
    pub metadata: RunMetadata,
    pub merge: &'a MergeStats,
    pub models: &'a [ModelFit],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub failed_models: &'a [FailedModel],
    pub comparisons: &'a [AnovaComparison],
    pub histograms: &'a [Histogram],
}

/// Run parameters recorded in the export metadata
pub struct ExportParams<'a> {
    pub deaths_file: &'a str,
    pub gdp_file: &'a str,
    pub population_file: &'a str,
    pub header_rows: usize,
    pub first_year: i64,
    pub last_year: i64,
    pub policy: ZeroMortalityPolicy,
}

/// Everything produced by a run that goes into the JSON export
pub struct RunResults<'a> {
    pub merge: &'a MergeStats,
    pub fits: &'a [ModelFit],
    pub failures: &'a [FailedModel],
    pub comparisons: &'a [AnovaComparison],
    pub histograms: &'a [Histogram],
}

/// Write the merged table to `path` as CSV
pub fn write_maindata(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}

/// Export model fits, comparisons and histograms to a JSON file with run metadata
pub fn export_results(output_path: &Path, params: &ExportParams, results: &RunResults) -> Result<()> {
    let export = ResultsExport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            hivstat_version: env!("CARGO_PKG_VERSION").to_string(),
            deaths_file: params.deaths_file.to_string(),
            gdp_file: params.gdp_file.to_string(),
            population_file: params.population_file.to_string(),
            header_rows: params.header_rows,
            first_year: params.first_year,
            last_year: params.last_year,
            zero_mortality_policy: params.policy,
        },
        merge: results.merge,
        models: results.fits,
        failed_models: results.failures,
        comparisons: results.comparisons,
        histograms: results.histograms,
    };

    let json = serde_json::to_string_pretty(&export).context("Failed to serialize model results")?;
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write results file: {}", output_path.display()))?;

    Ok(())
}
