//! Integration tests for the full load, merge, derive and model pipeline

use hivstat::model::{compare_battery, run_battery, standard_battery, standard_comparisons, Family};
use hivstat::pipeline::*;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn featured_fixture(temp_dir: &TempDir) -> (polars::prelude::DataFrame, MergeStats) {
    let files = write_fixture_set(temp_dir.path());
    let options = fixture_options();

    let deaths = load_deaths(&files.deaths).unwrap();
    let gdp = load_gdp(&files.gdp, &options).unwrap();
    let population = load_population(&files.population, &options).unwrap();

    let (maindata, stats) = merge_sources(&gdp, &population, &deaths).unwrap();
    (derive_features(&maindata).unwrap(), stats)
}

#[test]
fn test_end_to_end_merge_row_count() {
    let temp_dir = TempDir::new().unwrap();
    let (featured, stats) = featured_fixture(&temp_dir);

    // 2 countries x 2 years x 2 sexes x 2 age groups
    assert_eq!(featured.height(), 16);
    assert_eq!(stats.gdp_population_rows, 4);
    assert_eq!(stats.unmatched_country_years, 0);
    assert!(f64_values(&featured, "log_mortality_per_100k")
        .iter()
        .all(|v| v.is_some_and(f64::is_finite)));
}

#[test]
fn test_model_a_has_one_row_per_non_reference_level() {
    let temp_dir = TempDir::new().unwrap();
    let (featured, _) = featured_fixture(&temp_dir);

    let specs = standard_battery();
    let results = run_battery(&featured, &specs[..1], ZeroMortalityPolicy::Drop).unwrap();
    let fit = results.into_iter().next().unwrap().unwrap();

    let terms: Vec<&str> = fit.coefficients.iter().map(|c| c.coefficient.term.as_str()).collect();
    assert_eq!(
        terms,
        vec!["(Intercept)", "age_name25-49 years", "sex_nameFemale", "year", "gdp_per_capita"]
    );
    assert!(fit.aliased_terms().is_empty());
    assert_eq!(fit.n_obs, 16);
}

#[test]
fn test_full_battery_fits_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let (featured, _) = featured_fixture(&temp_dir);

    let specs = standard_battery();
    let results = run_battery(&featured, &specs, ZeroMortalityPolicy::default()).unwrap();

    assert_eq!(results.len(), 8);
    let fits: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    let names: Vec<&str> = fits.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "linear_A", "linear_B", "linear_C", "linear_D", "poisson_A", "poisson_B", "poisson_C",
            "poisson_D"
        ]
    );
    assert!(fits[..4].iter().all(|f| f.family == Family::Gaussian));
    assert!(fits[4..].iter().all(|f| f.family == Family::Poisson));

    // Only two years: the 2004 indicator is a function of year
    let linear_b = &fits[1];
    assert!(linear_b.aliased_terms().contains(&"year_20041"));

    let linear_d = &fits[3];
    assert!(linear_d.coefficient("country_nameBetastan").is_some());
    assert!(linear_d.coefficient("age_name25-49 years:sex_nameFemale").is_some());

    let comparisons = compare_battery(&fits, &standard_comparisons());
    assert_eq!(comparisons.len(), 6);
    // C adds the age-by-sex interaction, which is estimable
    let b_to_c = comparisons[1].as_ref().unwrap();
    assert_eq!((b_to_c.reduced.as_str(), b_to_c.full.as_str()), ("linear_B", "linear_C"));
    assert_eq!(b_to_c.df_difference(), 1);
}

#[test]
fn test_placeholder_policy_keeps_zero_mortality_rows() {
    let temp_dir = TempDir::new().unwrap();
    let files = write_fixture_set(temp_dir.path());
    let zero_deaths = write_file(
        temp_dir.path(),
        "zero_deaths.csv",
        &deaths_csv(&[ALPHA, BETA], &FIXTURE_YEARS, |loc, year, sex, age| {
            if loc == 101 && sex == 1 && age == 8 {
                0.0
            } else {
                death_value(loc, year, sex, age)
            }
        }),
    );
    let options = fixture_options();
    let (maindata, _) = merge_sources(
        &load_gdp(&files.gdp, &options).unwrap(),
        &load_population(&files.population, &options).unwrap(),
        &load_deaths(&zero_deaths).unwrap(),
    )
    .unwrap();
    let featured = derive_features(&maindata).unwrap();
    let specs = &standard_battery()[..1];

    let dropped = run_battery(&featured, specs, ZeroMortalityPolicy::Drop).unwrap();
    let kept = run_battery(&featured, specs, ZeroMortalityPolicy::Placeholder(LOG_ZERO_PLACEHOLDER)).unwrap();

    let dropped = dropped[0].as_ref().unwrap();
    let kept = kept[0].as_ref().unwrap();
    assert_eq!(dropped.n_obs, 14, "two zero-mortality rows excluded");
    assert_eq!(dropped.n_dropped, 2);
    assert_eq!(kept.n_obs, 16);
}

#[test]
fn test_failed_model_does_not_stop_others() {
    let temp_dir = TempDir::new().unwrap();
    let (featured, _) = featured_fixture(&temp_dir);
    let featured = featured.drop("gdp_per_capita").unwrap();

    let mut specs = standard_battery();
    specs.truncate(1);
    specs.push(hivstat::model::ModelSpec::new(
        "year_only",
        Family::Gaussian,
        "log_mortality_per_100k ~ year".parse().unwrap(),
    ));

    let results = run_battery(&featured, &specs, ZeroMortalityPolicy::Drop).unwrap();

    assert!(results[0].is_err(), "model A needs gdp_per_capita");
    assert!(results[1].is_ok());
}

#[test]
fn test_placeholder_policy_does_not_silently_drop_zero_population_rows() {
    let temp_dir = TempDir::new().unwrap();
    let (featured, _) = featured_fixture(&temp_dir);

    // Zero deaths in the first row and a zero population in the second
    let mut val = f64_values(&featured, "val");
    let mut population = f64_values(&featured, "population");
    val[0] = Some(0.0);
    population[1] = Some(0.0);
    let mut maindata = featured.clone();
    maindata
        .with_column(polars::prelude::Column::new("val".into(), val))
        .unwrap();
    maindata
        .with_column(polars::prelude::Column::new("population".into(), population))
        .unwrap();
    let featured = derive_features(&maindata).unwrap();

    let specs = &standard_battery()[..1];
    assert!(run_battery(&featured, specs, ZeroMortalityPolicy::Placeholder(LOG_ZERO_PLACEHOLDER)).is_err());

    let dropped = run_battery(&featured, specs, ZeroMortalityPolicy::Drop).unwrap();
    let fit = dropped[0].as_ref().unwrap();
    assert_eq!(fit.n_obs, 14);
    assert_eq!(fit.n_dropped, 2);
}
