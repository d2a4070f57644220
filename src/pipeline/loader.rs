//! Dataset loader for the deaths, GDP and population CSV files

use anyhow::{Context, Result};
use log::{debug, info};
use polars::prelude::*;
use std::path::Path;

use super::schema::{
    conform, conform_column, ColumnKind, SchemaError, COUNTRY_NAME, DEATH_COLUMNS, GDP_COLUMNS,
    GDP_PER_CAPITA, LOCATION_ID, POPULATION, POPULATION_COLUMNS, YEAR,
};

/// Header lines preceding the column row in World Bank style wide files
pub const DEFAULT_HEADER_ROWS: usize = 4;

/// First and last year kept when pivoting wide indicator files
pub const DEFAULT_FIRST_YEAR: i64 = 1990;
pub const DEFAULT_LAST_YEAR: i64 = 2019;

/// Options for reading a wide (one column per year) indicator file
#[derive(Debug, Clone)]
pub struct WideLoadOptions {
    /// Lines to skip before the header row
    pub header_rows: usize,
    pub first_year: i64,
    pub last_year: i64,
}

impl Default for WideLoadOptions {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            first_year: DEFAULT_FIRST_YEAR,
            last_year: DEFAULT_LAST_YEAR,
        }
    }
}

impl WideLoadOptions {
    pub fn years(&self) -> impl Iterator<Item = i64> {
        self.first_year..=self.last_year
    }
}

/// Read a CSV file into a DataFrame, inferring the schema over the whole file.
///
/// Full inference means a stray text cell late in a numeric column shows up
/// as a text column (and is rejected by the schema) instead of a parse error.
pub fn read_csv(path: &Path, skip_rows: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if extension != "csv" {
        anyhow::bail!(
            "Unsupported file format: '{}' ({}). Supported formats: csv",
            extension,
            path.display()
        );
    }

    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_skip_rows(skip_rows)
        .with_infer_schema_length(None)
        .finish()
        .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        .collect()
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))?;

    debug!("Read {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Convert a raw header into a snake_case column name.
///
/// Year headers that picked up a filler prefix while being turned into
/// identifiers (`X1990`, `x1990`, `_1990`) are restored to the bare year.
pub fn normalize_column_name(name: &str) -> String {
    let mut snake = String::with_capacity(name.len());
    let mut last_was_sep = true;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            snake.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            snake.push('_');
            last_was_sep = true;
        }
    }
    while snake.ends_with('_') {
        snake.pop();
    }

    if let Some(rest) = snake.strip_prefix('x') {
        if is_year_label(rest) {
            return rest.to_string();
        }
    }
    snake
}

fn is_year_label(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_digit())
}

/// Rename every column of `df` to its normalized form
pub fn normalize_column_names(df: &mut DataFrame) -> Result<()> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for name in names {
        let normalized = normalize_column_name(&name);
        if normalized != name {
            df.rename(&name, normalized.as_str().into())
                .with_context(|| format!("Column '{}' collides with another column after normalization", name))?;
        }
    }
    Ok(())
}

/// Drop rows without a location identifier
fn drop_missing_locations(df: DataFrame) -> Result<DataFrame> {
    let mask = df.column(LOCATION_ID)?.is_not_null();
    Ok(df.filter(&mask)?)
}

/// Load the long-format deaths file.
///
/// The source's `location_name` column is exposed as `country_name`.
pub fn load_deaths(path: &Path) -> Result<DataFrame> {
    let mut df = read_csv(path, 0)?;
    normalize_column_names(&mut df)?;

    let has_country = df.get_column_names().iter().any(|c| c.as_str() == COUNTRY_NAME);
    if !has_country && df.get_column_names().iter().any(|c| c.as_str() == "location_name") {
        df.rename("location_name", COUNTRY_NAME.into())?;
    }

    let df = conform(&df, DEATH_COLUMNS, "deaths")
        .with_context(|| format!("Invalid deaths file: {}", path.display()))?;
    let before = df.height();
    let df = drop_missing_locations(df)?;

    info!(
        "Loaded {} death records ({} without location dropped)",
        df.height(),
        before - df.height()
    );
    Ok(df)
}

/// Load a wide indicator file and pivot its year columns into `(year, value_name)`.
///
/// The output has `location_id`, then `country_name` when `keep_country` is set,
/// then `year` and the value column; one row per input row per year.
pub fn load_wide_indicator(
    path: &Path,
    value_name: &str,
    keep_country: bool,
    options: &WideLoadOptions,
) -> Result<DataFrame> {
    let source_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(value_name)
        .to_string();

    let mut df = read_csv(path, options.header_rows)?;
    normalize_column_names(&mut df)?;

    let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    if !columns.iter().any(|c| c == LOCATION_ID) {
        return Err(SchemaError::MissingColumn {
            source_name,
            column: LOCATION_ID.to_string(),
            available: columns,
        })
        .with_context(|| {
            format!(
                "Invalid indicator file {} (read with {} header rows skipped)",
                path.display(),
                options.header_rows
            )
        });
    }

    if keep_country && !columns.iter().any(|c| c == COUNTRY_NAME) {
        if columns.iter().any(|c| c == "location_name") {
            df.rename("location_name", COUNTRY_NAME.into())?;
        } else {
            return Err(SchemaError::MissingColumn {
                source_name,
                column: COUNTRY_NAME.to_string(),
                available: columns,
            }
            .into());
        }
    }

    if !options.years().any(|y| columns.iter().any(|c| *c == y.to_string())) {
        return Err(SchemaError::NoYearColumns {
            source_name,
            first: options.first_year,
            last: options.last_year,
        })
        .with_context(|| format!("Invalid indicator file: {}", path.display()));
    }

    let location = conform_column(df.column(LOCATION_ID)?, ColumnKind::Integer, &source_name)?;
    let country = if keep_country {
        Some(conform_column(df.column(COUNTRY_NAME)?, ColumnKind::Text, &source_name)?)
    } else {
        None
    };

    let mut long: Option<DataFrame> = None;
    for year in options.years() {
        let label = year.to_string();
        let values = df.column(&label).map_err(|_| SchemaError::MissingColumn {
            source_name: source_name.clone(),
            column: label.clone(),
            available: columns.clone(),
        })?;
        let values = conform_column(values, ColumnKind::Float, &source_name)?;

        let mut frame_columns = vec![location.clone()];
        if let Some(country) = &country {
            frame_columns.push(country.clone());
        }
        frame_columns.push(Column::new(YEAR.into(), vec![year; df.height()]));
        frame_columns.push(values.with_name(value_name.into()));

        let frame = DataFrame::new(frame_columns)?;
        match long.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&frame)?;
            }
            None => long = Some(frame),
        }
    }

    let long = long.context("Year range is empty")?;
    let before = long.height();
    let long = drop_missing_locations(long)?;

    info!(
        "Pivoted {} into {} long rows ({} without location dropped)",
        path.display(),
        long.height(),
        before - long.height()
    );
    Ok(long)
}

/// Load the GDP per capita file as `(location_id, country_name, year, gdp_per_capita)`
pub fn load_gdp(path: &Path, options: &WideLoadOptions) -> Result<DataFrame> {
    let df = load_wide_indicator(path, GDP_PER_CAPITA, true, options)?;
    Ok(conform(&df, GDP_COLUMNS, "gdp")?)
}

/// Load the population file as `(location_id, year, population)`
pub fn load_population(path: &Path, options: &WideLoadOptions) -> Result<DataFrame> {
    let df = load_wide_indicator(path, POPULATION, false, options)?;
    Ok(conform(&df, POPULATION_COLUMNS, "population")?)
}
