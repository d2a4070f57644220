//! Joins the GDP, population and deaths tables into the analytic table

use anyhow::{Context, Result};
use log::{debug, info};
use polars::prelude::*;
use serde::Serialize;

use super::schema::{conform, AGE_ID, LOCATION_ID, MAINDATA_COLUMNS, SEX_ID, YEAR};

/// Row counts observed while merging the three sources
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeStats {
    pub gdp_rows: usize,
    pub population_rows: usize,
    pub death_rows: usize,
    /// Country-years present in both GDP and population
    pub gdp_population_rows: usize,
    pub maindata_rows: usize,
    /// Country-years with no matching death record
    pub unmatched_country_years: usize,
}

/// Inner join of GDP and population on `(location_id, year)`.
///
/// Country-years present in only one of the two sources are dropped.
pub fn inner_join_gdp_population(gdp: &DataFrame, population: &DataFrame) -> Result<DataFrame> {
    let joined = gdp
        .clone()
        .lazy()
        .join(
            population.clone().lazy(),
            [col(LOCATION_ID), col(YEAR)],
            [col(LOCATION_ID), col(YEAR)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()
        .context("Failed to join GDP and population tables")?;

    Ok(joined)
}

/// Left join of the GDP/population table with deaths on `(year, location_id)`.
///
/// Every left row is kept; death columns are null where no stratum matches.
/// A column present on both sides is taken from the deaths table only, so it
/// is null on unmatched rows like every other death field.
pub fn left_join_deaths(gdp_population: &DataFrame, deaths: &DataFrame) -> Result<DataFrame> {
    let right_names: Vec<String> = deaths
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let (left_kept, replaced): (Vec<String>, Vec<String>) = gdp_population
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .partition(|name| name == LOCATION_ID || name == YEAR || !right_names.contains(name));
    if !replaced.is_empty() {
        debug!("Taking {:?} from the deaths table", replaced);
    }

    let joined = gdp_population
        .select(left_kept)?
        .lazy()
        .join(
            deaths.clone().lazy(),
            [col(YEAR), col(LOCATION_ID)],
            [col(YEAR), col(LOCATION_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()
        .context("Failed to join deaths onto GDP/population table")?;

    Ok(joined)
}

/// Merge the three sources into the analytic table ("maindata").
///
/// Output columns: identifiers (`location_id`, `country_name`, `year`) first,
/// then the remaining columns in arrival order. Rows are sorted by location,
/// year, sex and age.
pub fn merge_sources(
    gdp: &DataFrame,
    population: &DataFrame,
    deaths: &DataFrame,
) -> Result<(DataFrame, MergeStats)> {
    let gdp_population = inner_join_gdp_population(gdp, population)?;
    let merged = left_join_deaths(&gdp_population, deaths)?;

    let maindata = conform(&merged, MAINDATA_COLUMNS, "maindata")?
        .sort(
            [LOCATION_ID, YEAR, SEX_ID, AGE_ID],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .context("Failed to order merged table")?;

    let stats = MergeStats {
        gdp_rows: gdp.height(),
        population_rows: population.height(),
        death_rows: deaths.height(),
        gdp_population_rows: gdp_population.height(),
        maindata_rows: maindata.height(),
        unmatched_country_years: count_unmatched(&maindata)?,
    };

    info!(
        "Merged {} GDP x {} population rows into {} country-years; {} rows after joining deaths ({} country-years without deaths)",
        stats.gdp_rows,
        stats.population_rows,
        stats.gdp_population_rows,
        stats.maindata_rows,
        stats.unmatched_country_years
    );

    Ok((maindata, stats))
}

/// Count rows whose death stratum columns are all null
fn count_unmatched(maindata: &DataFrame) -> Result<usize> {
    let sex = maindata.column(SEX_ID)?.is_null();
    let age = maindata.column(AGE_ID)?.is_null();
    Ok(sex
        .into_iter()
        .zip(age.into_iter())
        .filter(|(s, a)| *s == Some(true) && *a == Some(true))
        .count())
}
