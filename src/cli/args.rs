//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::{Family, Formula, ModelSpec};
use crate::pipeline::{
    WideLoadOptions, ZeroMortalityPolicy, DEFAULT_FIRST_YEAR, DEFAULT_HEADER_ROWS,
    DEFAULT_LAST_YEAR, LOG_ZERO_PLACEHOLDER,
};
use crate::report::{DEFAULT_BINS, MAINDATA_FILE};

/// hivstat - Merge HIV deaths with GDP and population, then model mortality
#[derive(Parser, Debug)]
#[command(name = "hivstat")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Long-format HIV deaths CSV (location, sex, age, year, val, upper, lower)
    #[arg(long)]
    pub deaths: Option<PathBuf>,

    /// Wide-format GDP per capita CSV (one column per year)
    #[arg(long)]
    pub gdp: Option<PathBuf>,

    /// Wide-format population CSV (one column per year)
    #[arg(long)]
    pub population: Option<PathBuf>,

    /// Directory for maindata.csv and model_results.json
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub wide: WideArgs,

    /// Treatment of zero mortality (log is -inf) in the log-linear models.
    /// "drop" excludes those rows; "placeholder" substitutes --log-placeholder.
    #[arg(long, value_enum, default_value_t = ZeroMortality::Drop)]
    pub zero_mortality: ZeroMortality,

    /// Value substituted for -inf log mortality with --zero-mortality placeholder
    #[arg(long, default_value_t = LOG_ZERO_PLACEHOLDER, value_parser = validate_finite, allow_negative_numbers = true)]
    pub log_placeholder: f64,

    /// Number of equal-width bins in the mortality histograms
    #[arg(long, default_value_t = DEFAULT_BINS, value_parser = validate_bins)]
    pub histogram_bins: usize,

    /// Fit this formula instead of the standard A-D battery,
    /// e.g. "log_mortality_per_100k ~ age_name + sex_name + year"
    #[arg(long)]
    pub formula: Option<String>,

    /// Family for --formula: "gaussian" (least squares) or "poisson" (log link)
    #[arg(long, default_value = "gaussian", value_parser = parse_family)]
    pub family: Family,

    /// Skip writing model_results.json
    #[arg(long, default_value = "false")]
    pub no_export: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and merge the three sources, writing only the merged table
    Merge {
        /// Long-format HIV deaths CSV
        #[arg(long)]
        deaths: PathBuf,

        /// Wide-format GDP per capita CSV
        #[arg(long)]
        gdp: PathBuf,

        /// Wide-format population CSV
        #[arg(long)]
        population: PathBuf,

        /// Output CSV path
        #[arg(short, long, default_value = MAINDATA_FILE)]
        output: PathBuf,

        #[command(flatten)]
        wide: WideArgs,
    },
}

/// Layout of the wide GDP and population files
#[derive(Args, Debug, Clone, Copy)]
pub struct WideArgs {
    /// Metadata lines above the column header in the wide files
    #[arg(long, default_value_t = DEFAULT_HEADER_ROWS)]
    pub header_rows: usize,

    /// First year kept from the wide files
    #[arg(long, default_value_t = DEFAULT_FIRST_YEAR)]
    pub first_year: i64,

    /// Last year kept from the wide files (inclusive)
    #[arg(long, default_value_t = DEFAULT_LAST_YEAR)]
    pub last_year: i64,
}

impl WideArgs {
    pub fn load_options(&self) -> Result<WideLoadOptions> {
        if self.first_year > self.last_year {
            anyhow::bail!(
                "--first-year ({}) must not be after --last-year ({})",
                self.first_year,
                self.last_year
            );
        }
        Ok(WideLoadOptions {
            header_rows: self.header_rows,
            first_year: self.first_year,
            last_year: self.last_year,
        })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroMortality {
    Drop,
    Placeholder,
}

/// The three input paths of a run
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub deaths: PathBuf,
    pub gdp: PathBuf,
    pub population: PathBuf,
}

impl Cli {
    /// Input paths, required when no subcommand is given
    pub fn sources(&self) -> Result<SourcePaths> {
        let require = |path: &Option<PathBuf>, flag: &str| {
            path.clone()
                .with_context(|| format!("Input file is required. Use --{} to specify a file.", flag))
        };
        Ok(SourcePaths {
            deaths: require(&self.deaths, "deaths")?,
            gdp: require(&self.gdp, "gdp")?,
            population: require(&self.population, "population")?,
        })
    }

    pub fn zero_mortality_policy(&self) -> ZeroMortalityPolicy {
        match self.zero_mortality {
            ZeroMortality::Drop => ZeroMortalityPolicy::Drop,
            ZeroMortality::Placeholder => ZeroMortalityPolicy::Placeholder(self.log_placeholder),
        }
    }

    /// The model given by --formula/--family, if any
    pub fn custom_model(&self) -> Result<Option<ModelSpec>> {
        let Some(text) = &self.formula else {
            return Ok(None);
        };
        let formula: Formula = text
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid --formula '{}': {}", text, e))?;
        Ok(Some(ModelSpec::new("custom", self.family, formula)))
    }

    pub fn maindata_path(&self) -> PathBuf {
        self.output_dir.join(MAINDATA_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(crate::report::RESULTS_FILE)
    }
}

/// Display form of a path for messages and metadata
pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Validator for histogram_bins parameter
fn validate_bins(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid bin count", s))?;

    if value == 0 {
        Err("histogram_bins must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for log_placeholder parameter
fn validate_finite(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("log_placeholder must be finite, got {}", value))
    }
}

fn parse_family(s: &str) -> Result<Family, String> {
    s.parse()
}
