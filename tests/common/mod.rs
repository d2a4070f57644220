//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use hivstat::pipeline::WideLoadOptions;
use polars::prelude::*;

/// Country used in fixtures: `(location_id, name)`
pub type Country = (i64, &'static str);

pub const ALPHA: Country = (101, "Alphaland");
pub const BETA: Country = (102, "Betastan");
pub const GAMMA: Country = (103, "Gammaria");

pub const SEXES: [(i64, &str); 2] = [(1, "Male"), (2, "Female")];
pub const AGES: [(i64, &str); 2] = [(8, "10-24 years"), (9, "25-49 years")];

/// Metadata lines written above the header of wide fixture files
pub const WIDE_HEADER_LINES: usize = 4;

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// A wide indicator file in the World Bank layout: four metadata lines, then
/// `country_name,location_id,<year>...` with one row per country.
pub fn wide_csv(countries: &[Country], years: &[i64], value: impl Fn(i64, i64) -> f64) -> String {
    wide_csv_with_year_labels(countries, years, |y| y.to_string(), value)
}

/// Like `wide_csv`, with a custom header label for each year column
pub fn wide_csv_with_year_labels(
    countries: &[Country],
    years: &[i64],
    label: impl Fn(i64) -> String,
    value: impl Fn(i64, i64) -> f64,
) -> String {
    let mut out = String::new();
    out.push_str("Data Source: synthetic\n");
    out.push_str("Last Updated Date: 2024-01-01\n");
    out.push_str("Indicator: fixture\n");
    out.push_str("Notes: none\n");

    let headers: Vec<String> = years.iter().map(|y| label(*y)).collect();
    out.push_str(&format!("country_name,location_id,{}\n", headers.join(",")));

    for (location_id, name) in countries {
        let values: Vec<String> = years
            .iter()
            .map(|y| format!("{}", value(*location_id, *y)))
            .collect();
        out.push_str(&format!("{},{},{}\n", name, location_id, values.join(",")));
    }
    out
}

/// A long deaths file with one row per country, year, sex and age group
pub fn deaths_csv(countries: &[Country], years: &[i64], val: impl Fn(i64, i64, i64, i64) -> f64) -> String {
    let mut out = String::from("location_id,location_name,sex_id,sex_name,age_id,age_name,year,val,upper,lower\n");
    for (location_id, name) in countries {
        for year in years {
            for (sex_id, sex_name) in SEXES {
                for (age_id, age_name) in AGES {
                    let v = val(*location_id, *year, sex_id, age_id);
                    out.push_str(&format!(
                        "{},{},{},{},{},{},{},{},{},{}\n",
                        location_id,
                        name,
                        sex_id,
                        sex_name,
                        age_id,
                        age_name,
                        year,
                        v,
                        v * 1.2,
                        v * 0.8
                    ));
                }
            }
        }
    }
    out
}

/// Deterministic GDP per capita whose year trend differs by country, so it is
/// not a combination of country and year effects
pub fn gdp_value(location_id: i64, year: i64) -> f64 {
    let country = (location_id - 100) as f64;
    250.0 + 1000.0 * country + 37.0 * ((year - 2000) * (year - 2000)) as f64 * country
}

/// Deterministic population, distinct per country-year
pub fn population_value(location_id: i64, year: i64) -> f64 {
    1_000_000.0 * (location_id - 100) as f64 + 5_000.0 * (year - 2000) as f64
}

/// Deterministic death counts with structure in every covariate plus a little irregularity
pub fn death_value(location_id: i64, year: i64, sex_id: i64, age_id: i64) -> f64 {
    let base = 40.0 + 15.0 * (age_id - 8) as f64 + 6.0 * (sex_id - 1) as f64;
    let trend = 3.0 * (year - 2004) as f64 + 2.0 * (location_id - 101) as f64;
    let wobble = ((location_id * 7 + year * 3 + sex_id * 5 + age_id) % 4) as f64;
    (base + trend + wobble).round()
}

/// The three input files of an end-to-end run: 2 countries, years 2004-2005,
/// 2 sexes and 2 age groups
pub struct FixtureSet {
    pub deaths: PathBuf,
    pub gdp: PathBuf,
    pub population: PathBuf,
}

pub const FIXTURE_YEARS: [i64; 2] = [2004, 2005];

pub fn write_fixture_set(dir: &Path) -> FixtureSet {
    let countries = [ALPHA, BETA];
    FixtureSet {
        deaths: write_file(
            dir,
            "final_hiv_deaths.csv",
            &deaths_csv(&countries, &FIXTURE_YEARS, death_value),
        ),
        gdp: write_file(
            dir,
            "final_gdp_per_capita.csv",
            &wide_csv(&countries, &FIXTURE_YEARS, gdp_value),
        ),
        population: write_file(
            dir,
            "final_population_total.csv",
            &wide_csv(&countries, &FIXTURE_YEARS, population_value),
        ),
    }
}

pub fn fixture_options() -> WideLoadOptions {
    WideLoadOptions {
        header_rows: WIDE_HEADER_LINES,
        first_year: FIXTURE_YEARS[0],
        last_year: FIXTURE_YEARS[1],
    }
}

/// Long GDP table as produced by the loader
pub fn gdp_frame(rows: &[(i64, &str, i64, f64)]) -> DataFrame {
    df! {
        "location_id" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        "country_name" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "year" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "gdp_per_capita" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
    }
    .unwrap()
}

/// Long population table as produced by the loader
pub fn population_frame(rows: &[(i64, i64, f64)]) -> DataFrame {
    df! {
        "location_id" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        "year" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "population" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
    }
    .unwrap()
}

/// Deaths table as produced by the loader: `(location_id, country, year, sex, age, val)`
pub fn deaths_frame(rows: &[(i64, &str, i64, &str, &str, f64)]) -> DataFrame {
    let sex_id = |s: &str| if s == "Male" { 1i64 } else { 2 };
    let age_id = |a: &str| match a {
        "0-9 years" => 7i64,
        "10-24 years" => 8,
        "25-49 years" => 9,
        "50-74 years" => 10,
        _ => 11,
    };
    df! {
        "location_id" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        "country_name" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "sex_id" => rows.iter().map(|r| sex_id(r.3)).collect::<Vec<_>>(),
        "sex_name" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        "age_id" => rows.iter().map(|r| age_id(r.4)).collect::<Vec<_>>(),
        "age_name" => rows.iter().map(|r| r.4).collect::<Vec<_>>(),
        "year" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "val" => rows.iter().map(|r| r.5).collect::<Vec<_>>(),
        "upper" => rows.iter().map(|r| r.5 * 1.2).collect::<Vec<_>>(),
        "lower" => rows.iter().map(|r| r.5 * 0.8).collect::<Vec<_>>(),
    }
    .unwrap()
}

/// Column as `Vec<Option<f64>>`
pub fn f64_values(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
    df.column(column)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

/// Column as `Vec<Option<i64>>`
pub fn i64_values(df: &DataFrame, column: &str) -> Vec<Option<i64>> {
    df.column(column)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}

/// Column as `Vec<Option<String>>`
pub fn str_values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect()
}
