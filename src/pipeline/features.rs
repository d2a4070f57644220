//! Derived regression features: mortality rates, the 2004 indicator and factor levels

use std::borrow::Cow;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use polars::prelude::*;
use serde::Serialize;

use super::schema::{
    SchemaError, AGE_NAME, COUNTRY_NAME, LOG_MORTALITY_PER_100K, MORTALITY_PER_100K, POPULATION,
    SEX_NAME, VAL, YEAR, YEAR_2004,
};

/// Population unit for mortality rates
pub const PER_POPULATION: f64 = 100_000.0;

/// Last year (inclusive) flagged by `year_2004`
pub const YEAR_2004_CUTOFF: i64 = 2004;

/// Value written over `-inf` log mortality when the placeholder policy is used
pub const LOG_ZERO_PLACEHOLDER: f64 = 0.01;

/// Age groups in their natural order; the first is the baseline level
pub const AGE_LEVELS: [&str; 5] = [
    "0-9 years",
    "10-24 years",
    "25-49 years",
    "50-74 years",
    "75+ years",
];

const YEAR_2004_LEVELS: [&str; 2] = ["0", "1"];

/// Add `mortality_per_100k`, `log_mortality_per_100k` and `year_2004` to the merged table.
///
/// Mortality is `val / (population / 100000)`: infinite for a zero population
/// and null when either input is null. The log is `-inf` for zero mortality;
/// that value is left in place here.
pub fn derive_features(maindata: &DataFrame) -> Result<DataFrame> {
    let val = maindata.column(VAL)?.cast(&DataType::Float64)?;
    let population = maindata.column(POPULATION)?.cast(&DataType::Float64)?;
    let year = maindata.column(YEAR)?.cast(&DataType::Int64)?;

    let mortality: Vec<Option<f64>> = val
        .f64()?
        .into_iter()
        .zip(population.f64()?.into_iter())
        .map(|(v, p)| match (v, p) {
            (Some(v), Some(p)) => Some(v / (p / PER_POPULATION)),
            _ => None,
        })
        .collect();

    let log_mortality: Vec<Option<f64>> = mortality.iter().map(|m| m.map(f64::ln)).collect();

    let year_2004: Vec<Option<i32>> = year
        .i64()?
        .into_iter()
        .map(|y| y.map(|y| i32::from(y <= YEAR_2004_CUTOFF)))
        .collect();

    let zero_count = log_mortality
        .iter()
        .filter(|m| matches!(m, Some(v) if *v == f64::NEG_INFINITY))
        .count();
    if zero_count > 0 {
        info!("{} rows have zero mortality (log is -inf)", zero_count);
    }

    let mut df = maindata.clone();
    df.with_column(Column::new(MORTALITY_PER_100K.into(), mortality))?;
    df.with_column(Column::new(LOG_MORTALITY_PER_100K.into(), log_mortality))?;
    df.with_column(Column::new(YEAR_2004.into(), year_2004))?;
    Ok(df)
}

/// Replace `-inf` log mortality (zero deaths) with `placeholder`.
///
/// This is an ad-hoc cleaning step, not a transform: only exact `-inf`
/// entries change. Returns the new table and the number of substituted rows.
pub fn apply_log_zero_placeholder(df: &DataFrame, placeholder: f64) -> Result<(DataFrame, usize)> {
    let log_mortality = df
        .column(LOG_MORTALITY_PER_100K)
        .context("Log mortality must be derived before substituting zeros")?;

    let mut substituted = 0usize;
    let values: Vec<Option<f64>> = log_mortality
        .f64()?
        .into_iter()
        .map(|v| match v {
            Some(x) if x == f64::NEG_INFINITY => {
                substituted += 1;
                Some(placeholder)
            }
            other => other,
        })
        .collect();

    let mut out = df.clone();
    out.with_column(Column::new(LOG_MORTALITY_PER_100K.into(), values))?;
    Ok((out, substituted))
}

/// How non-finite log mortality is treated before the log-linear fits
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum ZeroMortalityPolicy {
    /// Exclude rows with a non-finite outcome when building each model frame
    #[default]
    Drop,
    /// Substitute `-inf` with a fixed value before fitting
    Placeholder(f64),
}

impl std::fmt::Display for ZeroMortalityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZeroMortalityPolicy::Drop => write!(f, "drop"),
            ZeroMortalityPolicy::Placeholder(v) => write!(f, "placeholder ({})", v),
        }
    }
}

impl ZeroMortalityPolicy {
    /// Apply the policy to a featured table, returning the table for the
    /// log-linear fits with the count of affected rows.
    ///
    /// `Drop` leaves the table as is; the model frames exclude its non-finite
    /// rows. `Placeholder` substitutes `-inf` and fails if any other
    /// non-finite log mortality remains, since those rows could only be dropped.
    pub fn apply<'a>(&self, df: &'a DataFrame) -> Result<(Cow<'a, DataFrame>, usize)> {
        let counts = NonFiniteLogMortality::count(df)?;
        match self {
            ZeroMortalityPolicy::Drop => Ok((Cow::Borrowed(df), counts.total())),
            ZeroMortalityPolicy::Placeholder(value) => {
                counts.ensure_substitutable()?;
                let (out, substituted) = apply_log_zero_placeholder(df, *value)?;
                Ok((Cow::Owned(out), substituted))
            }
        }
    }

    /// Number of rows `apply` would act on, without building a new table
    pub fn affected_rows(&self, df: &DataFrame) -> Result<usize> {
        let counts = NonFiniteLogMortality::count(df)?;
        match self {
            ZeroMortalityPolicy::Drop => Ok(counts.total()),
            ZeroMortalityPolicy::Placeholder(_) => {
                counts.ensure_substitutable()?;
                Ok(counts.negative_infinity)
            }
        }
    }
}

/// Non-finite log mortality split by cause
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonFiniteLogMortality {
    /// Zero mortality
    pub negative_infinity: usize,
    /// `+inf` (zero population) or NaN (zero deaths over zero population)
    pub other: usize,
}

impl NonFiniteLogMortality {
    pub fn count(df: &DataFrame) -> Result<Self> {
        let log_mortality = df
            .column(LOG_MORTALITY_PER_100K)
            .context("Log mortality must be derived before applying a zero-mortality policy")?;

        let mut counts = Self::default();
        for value in log_mortality.f64()?.into_iter().flatten() {
            if value == f64::NEG_INFINITY {
                counts.negative_infinity += 1;
            } else if !value.is_finite() {
                counts.other += 1;
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.negative_infinity + self.other
    }

    fn ensure_substitutable(&self) -> Result<()> {
        if self.other > 0 {
            bail!(
                "{} row(s) have infinite or NaN log mortality from a zero population; \
                 the placeholder policy only replaces zero mortality. \
                 Use --zero-mortality drop to exclude them",
                self.other
            );
        }
        Ok(())
    }
}

/// Ordering rule for a factor's levels; the first level is the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOrder {
    /// Levels in the order they are first seen
    FirstObserved,
    /// A fixed level list; observed values outside it are an error
    Fixed(&'static [&'static str]),
}

/// Level ordering used for each known categorical variable
pub fn level_order(variable: &str) -> LevelOrder {
    match variable {
        AGE_NAME => LevelOrder::Fixed(&AGE_LEVELS),
        YEAR_2004 => LevelOrder::Fixed(&YEAR_2004_LEVELS),
        _ => LevelOrder::FirstObserved,
    }
}

/// A categorical variable: its ordered levels and one level code per row
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub name: String,
    pub levels: Vec<String>,
    pub codes: Vec<Option<usize>>,
}

impl Factor {
    /// Build a factor from row labels. Only observed levels are kept, so a
    /// fixed ordering is restricted to the labels that actually occur.
    pub fn from_labels(name: &str, labels: &[Option<String>], order: LevelOrder) -> Result<Self, SchemaError> {
        let mut observed: Vec<String> = Vec::new();
        for label in labels.iter().flatten() {
            if !observed.contains(label) {
                observed.push(label.clone());
            }
        }

        let levels = match order {
            LevelOrder::FirstObserved => observed,
            LevelOrder::Fixed(known) => {
                if let Some(unknown) = observed.iter().find(|l| !known.contains(&l.as_str())) {
                    return Err(SchemaError::UnknownLevel {
                        variable: name.to_string(),
                        label: unknown.clone(),
                        expected: known.iter().map(|s| s.to_string()).collect(),
                    });
                }
                known
                    .iter()
                    .filter(|k| observed.iter().any(|o| o == *k))
                    .map(|k| k.to_string())
                    .collect()
            }
        };

        let codes = labels
            .iter()
            .map(|label| {
                label
                    .as_ref()
                    .and_then(|l| levels.iter().position(|level| level == l))
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            levels,
            codes,
        })
    }

    pub fn baseline(&self) -> Option<&str> {
        self.levels.first().map(|s| s.as_str())
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }
}

/// Read a column's values as labels (numbers are rendered as text)
pub fn column_labels(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let labels = df
        .column(column)
        .with_context(|| format!("Categorical column '{}' not found", column))?
        .cast(&DataType::String)?;
    Ok(labels
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Cast a column to a factor using its registered level ordering
pub fn resolve_factor(df: &DataFrame, column: &str) -> Result<Factor> {
    let labels = column_labels(df, column)?;
    Ok(Factor::from_labels(column, &labels, level_order(column))?)
}

/// The categorical variables of the regression table
#[derive(Debug, Clone)]
pub struct CategoricalColumns {
    pub age: Factor,
    pub sex: Factor,
    pub country: Factor,
    pub year_2004: Factor,
}

/// Resolve every categorical variable, validating the age groups
pub fn cast_categoricals(df: &DataFrame) -> Result<CategoricalColumns> {
    let categoricals = CategoricalColumns {
        age: resolve_factor(df, AGE_NAME)?,
        sex: resolve_factor(df, SEX_NAME)?,
        country: resolve_factor(df, COUNTRY_NAME)?,
        year_2004: resolve_factor(df, YEAR_2004)?,
    };

    if categoricals.age.n_levels() < AGE_LEVELS.len() {
        warn!(
            "Only {} of {} age groups present in the data",
            categoricals.age.n_levels(),
            AGE_LEVELS.len()
        );
    }

    Ok(categoricals)
}
