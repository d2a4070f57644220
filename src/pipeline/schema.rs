//! Column schemas for the three input sources and the merged table
//!
//! Every stage boundary validates its table against one of these schemas so
//! that a malformed file fails loudly at load time instead of surfacing as
//! nulls inside a model fit.

use polars::prelude::*;
use thiserror::Error;

pub const LOCATION_ID: &str = "location_id";
pub const COUNTRY_NAME: &str = "country_name";
pub const YEAR: &str = "year";
pub const SEX_ID: &str = "sex_id";
pub const SEX_NAME: &str = "sex_name";
pub const AGE_ID: &str = "age_id";
pub const AGE_NAME: &str = "age_name";
pub const VAL: &str = "val";
pub const UPPER: &str = "upper";
pub const LOWER: &str = "lower";
pub const GDP_PER_CAPITA: &str = "gdp_per_capita";
pub const POPULATION: &str = "population";
pub const MORTALITY_PER_100K: &str = "mortality_per_100k";
pub const LOG_MORTALITY_PER_100K: &str = "log_mortality_per_100k";
pub const YEAR_2004: &str = "year_2004";

/// Logical column type expected by a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnKind::Integer => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Text => DataType::String,
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Integer => write!(f, "integer"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// A named, typed column in a table schema
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn column(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

/// Long-format deaths table, one row per (country, year, sex, age group)
pub const DEATH_COLUMNS: &[ColumnSpec] = &[
    column(LOCATION_ID, ColumnKind::Integer),
    column(COUNTRY_NAME, ColumnKind::Text),
    column(SEX_ID, ColumnKind::Integer),
    column(SEX_NAME, ColumnKind::Text),
    column(AGE_ID, ColumnKind::Integer),
    column(AGE_NAME, ColumnKind::Text),
    column(YEAR, ColumnKind::Integer),
    column(VAL, ColumnKind::Float),
    column(UPPER, ColumnKind::Float),
    column(LOWER, ColumnKind::Float),
];

/// Long-format GDP per capita table
pub const GDP_COLUMNS: &[ColumnSpec] = &[
    column(LOCATION_ID, ColumnKind::Integer),
    column(COUNTRY_NAME, ColumnKind::Text),
    column(YEAR, ColumnKind::Integer),
    column(GDP_PER_CAPITA, ColumnKind::Float),
];

/// Long-format population table
pub const POPULATION_COLUMNS: &[ColumnSpec] = &[
    column(LOCATION_ID, ColumnKind::Integer),
    column(YEAR, ColumnKind::Integer),
    column(POPULATION, ColumnKind::Float),
];

/// Merged analytic table ("maindata"), in output column order
pub const MAINDATA_COLUMNS: &[ColumnSpec] = &[
    column(LOCATION_ID, ColumnKind::Integer),
    column(COUNTRY_NAME, ColumnKind::Text),
    column(YEAR, ColumnKind::Integer),
    column(GDP_PER_CAPITA, ColumnKind::Float),
    column(POPULATION, ColumnKind::Float),
    column(SEX_ID, ColumnKind::Integer),
    column(SEX_NAME, ColumnKind::Text),
    column(AGE_ID, ColumnKind::Integer),
    column(AGE_NAME, ColumnKind::Text),
    column(VAL, ColumnKind::Float),
    column(UPPER, ColumnKind::Float),
    column(LOWER, ColumnKind::Float),
];

/// Errors raised while validating an input table against its schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{source_name}: required column '{column}' not found (available: {available:?})")]
    MissingColumn {
        source_name: String,
        column: String,
        available: Vec<String>,
    },

    #[error("{source_name}: column '{column}' must be {expected} but contains non-numeric value '{value}'")]
    NonNumeric {
        source_name: String,
        column: String,
        expected: ColumnKind,
        value: String,
    },

    #[error("{source_name}: column '{column}' has type {actual}, expected {expected}")]
    WrongType {
        source_name: String,
        column: String,
        expected: ColumnKind,
        actual: String,
    },

    #[error("{source_name}: no year columns between {first} and {last}; check the header row count")]
    NoYearColumns {
        source_name: String,
        first: i64,
        last: i64,
    },

    #[error("{variable}: unknown level '{label}' (expected one of {expected:?})")]
    UnknownLevel {
        variable: String,
        label: String,
        expected: Vec<String>,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Cast every column in `spec` to its declared type and return them in schema order.
///
/// Text cells in a numeric column are an error; empty cells stay null.
pub fn conform(df: &DataFrame, spec: &[ColumnSpec], source_name: &str) -> Result<DataFrame, SchemaError> {
    let available: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut columns = Vec::with_capacity(spec.len());

    for column_spec in spec {
        let column = df.column(column_spec.name).map_err(|_| SchemaError::MissingColumn {
            source_name: source_name.to_string(),
            column: column_spec.name.to_string(),
            available: available.clone(),
        })?;
        columns.push(conform_column(column, column_spec.kind, source_name)?);
    }

    Ok(DataFrame::new(columns)?)
}

/// Cast a single column to `kind`, rejecting text in numeric columns.
pub fn conform_column(column: &Column, kind: ColumnKind, source_name: &str) -> Result<Column, SchemaError> {
    let dtype = column.dtype();
    let name = column.name().to_string();

    match kind {
        ColumnKind::Text => {
            if dtype.is_primitive_numeric() || *dtype == DataType::String || *dtype == DataType::Null {
                column.cast(&DataType::String).map_err(|e| SchemaError::WrongType {
                    source_name: source_name.to_string(),
                    column: name,
                    expected: kind,
                    actual: e.to_string(),
                })
            } else {
                Err(SchemaError::WrongType {
                    source_name: source_name.to_string(),
                    column: name,
                    expected: kind,
                    actual: dtype.to_string(),
                })
            }
        }
        ColumnKind::Integer | ColumnKind::Float => {
            if *dtype == DataType::String {
                // All-empty or quoted-number columns are inferred as text
                if let Some(value) = first_non_numeric_text(column) {
                    return Err(SchemaError::NonNumeric {
                        source_name: source_name.to_string(),
                        column: name,
                        expected: kind,
                        value,
                    });
                }
            } else if !dtype.is_primitive_numeric() && *dtype != DataType::Null {
                return Err(SchemaError::WrongType {
                    source_name: source_name.to_string(),
                    column: name,
                    expected: kind,
                    actual: dtype.to_string(),
                });
            }

            column.cast(&kind.dtype()).map_err(|e| SchemaError::WrongType {
                source_name: source_name.to_string(),
                column: name,
                expected: kind,
                actual: e.to_string(),
            })
        }
    }
}

fn first_non_numeric_text(column: &Column) -> Option<String> {
    let ca = column.str().ok()?;
    ca.into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty() && s.parse::<f64>().is_err())
        .map(|s| s.to_string())
}
