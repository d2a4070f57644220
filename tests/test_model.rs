//! Tests for model fitting and nested comparisons

use hivstat::model::{
    compare_models, fit_model, Family, FitStatistics, Formula, ModelError, ModelFit, ModelSpec,
};
use polars::prelude::*;

fn spec(name: &str, family: Family, formula: &str) -> ModelSpec {
    let formula: Formula = formula.parse().unwrap();
    ModelSpec::new(name, family, formula)
}

fn estimate(fit: &ModelFit, term: &str) -> f64 {
    fit.coefficient(term)
        .unwrap_or_else(|| panic!("no term {} in {:?}", term, fit.coefficients))
        .coefficient
        .estimate
        .unwrap()
}

/// 24 rows over two age groups, two sexes and six years with irregular GDP
fn design_frame(response: &str, f: impl Fn(bool, bool, i64, f64) -> f64) -> DataFrame {
    let mut ages = Vec::new();
    let mut sexes = Vec::new();
    let mut years = Vec::new();
    let mut gdp = Vec::new();
    let mut y = Vec::new();

    let mut i = 0;
    for older in [false, true] {
        for female in [false, true] {
            for year in 2000..2006i64 {
                let g = 1.0 + ((i * 7) % 11) as f64 * 0.5;
                ages.push(if older { "25-49 years" } else { "10-24 years" });
                sexes.push(if female { "Female" } else { "Male" });
                years.push(year);
                gdp.push(g);
                y.push(f(older, female, year, g));
                i += 1;
            }
        }
    }

    df! {
        response => y,
        "age_name" => ages,
        "sex_name" => sexes,
        "year" => years,
        "gdp_per_capita" => gdp,
    }
    .unwrap()
}

#[test]
fn test_ols_recovers_noiseless_coefficients() {
    let df = design_frame("log_mortality_per_100k", |older, female, year, g| {
        1.5 + 0.7 * older as i32 as f64 - 0.4 * female as i32 as f64 + 0.03 * (year - 2000) as f64 + 0.2 * g
    });
    let fit = fit_model(
        &df,
        &spec(
            "exact",
            Family::Gaussian,
            "log_mortality_per_100k ~ age_name + sex_name + year + gdp_per_capita",
        ),
    )
    .unwrap();

    let terms: Vec<&str> = fit.coefficients.iter().map(|c| c.coefficient.term.as_str()).collect();
    assert_eq!(
        terms,
        vec!["(Intercept)", "age_name25-49 years", "sex_nameFemale", "year", "gdp_per_capita"]
    );
    assert!((estimate(&fit, "age_name25-49 years") - 0.7).abs() < 1e-8);
    assert!((estimate(&fit, "sex_nameFemale") + 0.4).abs() < 1e-8);
    assert!((estimate(&fit, "year") - 0.03).abs() < 1e-8);
    assert!((estimate(&fit, "gdp_per_capita") - 0.2).abs() < 1e-8);
    assert!((estimate(&fit, "(Intercept)") - (1.5 - 0.03 * 2000.0)).abs() < 1e-5);

    match fit.statistics {
        FitStatistics::Gaussian { rss, r_squared, rank, df_residual, .. } => {
            assert!(rss < 1e-12);
            assert!((r_squared - 1.0).abs() < 1e-9);
            assert_eq!(rank, 5);
            assert_eq!(df_residual, 19);
        }
        _ => panic!("expected Gaussian statistics"),
    }
}

#[test]
fn test_log_scale_models_report_exp_estimate() {
    let df = design_frame("log_mortality_per_100k", |older, _, year, g| {
        2.0 + older as i32 as f64 + 0.01 * year as f64 + 0.1 * g + ((year % 3) as f64) * 0.05
    });
    let fit = fit_model(
        &df,
        &spec("log", Family::Gaussian, "log_mortality_per_100k ~ age_name + year"),
    )
    .unwrap();

    let row = fit.coefficient("age_name25-49 years").unwrap();
    let b = row.coefficient.estimate.unwrap();
    assert!((row.exp_estimate.unwrap() - b.exp()).abs() < 1e-12);
    assert!((row.percent_change().unwrap() - (b.exp() - 1.0) * 100.0).abs() < 1e-9);
}

#[test]
fn test_aliased_term_is_na_not_failure() {
    // With only two years, year_2004 is a linear function of year
    let df = df! {
        "log_mortality_per_100k" => [1.0, 1.2, 0.9, 1.4, 1.1, 1.3],
        "year" => [2004i64, 2005, 2004, 2005, 2004, 2005],
        "year_2004" => [1i32, 0, 1, 0, 1, 0],
    }
    .unwrap();

    let fit = fit_model(
        &df,
        &spec("aliased", Family::Gaussian, "log_mortality_per_100k ~ year * year_2004"),
    )
    .unwrap();

    assert!(fit.coefficient("year").unwrap().coefficient.estimate.is_some());
    assert_eq!(fit.aliased_terms(), vec!["year_20041", "year:year_20041"]);
    let na = fit.coefficient("year_20041").unwrap();
    assert!(na.coefficient.std_error.is_none());
    assert!(na.exp_estimate.is_none());
}

#[test]
fn test_rows_with_missing_values_are_dropped() {
    let df = df! {
        "log_mortality_per_100k" => [Some(1.0), Some(f64::NEG_INFINITY), None, Some(2.0), Some(3.5)],
        "year" => [Some(2000i64), Some(2001), Some(2002), None, Some(2004)],
    }
    .unwrap();

    let fit = fit_model(&df, &spec("partial", Family::Gaussian, "log_mortality_per_100k ~ year")).unwrap();

    assert_eq!(fit.n_obs, 2);
    assert_eq!(fit.n_dropped, 3);
}

#[test]
fn test_no_complete_rows_fails() {
    let df = df! {
        "log_mortality_per_100k" => [None::<f64>, None],
        "year" => [2000i64, 2001],
    }
    .unwrap();

    let err = fit_model(&df, &spec("empty", Family::Gaussian, "log_mortality_per_100k ~ year")).unwrap_err();
    assert!(matches!(err, ModelError::NoObservations { .. }));
}

#[test]
fn test_missing_variable_fails() {
    let df = df! {
        "log_mortality_per_100k" => [1.0, 2.0],
        "year" => [2000i64, 2001],
    }
    .unwrap();

    let err = fit_model(
        &df,
        &spec("nocountry", Family::Gaussian, "log_mortality_per_100k ~ year + country_name"),
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::MissingVariable { ref variable, .. } if variable == "country_name"));
}

#[test]
fn test_poisson_recovers_log_rate_coefficients() {
    // Outcomes equal to their log-linear means make the MLE exact
    let df = design_frame("val", |older, female, _, g| {
        (3.0 + 0.8 * older as i32 as f64 - 0.25 * female as i32 as f64 + 0.1 * g).exp()
    });
    let fit = fit_model(
        &df,
        &spec("poisson", Family::Poisson, "val ~ age_name + sex_name + gdp_per_capita"),
    )
    .unwrap();

    assert!((estimate(&fit, "(Intercept)") - 3.0).abs() < 1e-6);
    assert!((estimate(&fit, "age_name25-49 years") - 0.8).abs() < 1e-6);
    assert!((estimate(&fit, "sex_nameFemale") + 0.25).abs() < 1e-6);
    assert!((estimate(&fit, "gdp_per_capita") - 0.1).abs() < 1e-6);

    match fit.statistics {
        FitStatistics::Poisson { deviance, converged, iterations, .. } => {
            assert!(converged);
            assert!(iterations <= 25);
            assert!(deviance.abs() < 1e-6);
        }
        _ => panic!("expected Poisson statistics"),
    }
    let row = fit.coefficient("sex_nameFemale").unwrap();
    assert!((row.exp_estimate.unwrap() - (-0.25f64).exp()).abs() < 1e-6);
}

#[test]
fn test_poisson_rejects_negative_counts() {
    let df = df! {
        "val" => [3.0, -1.0, 4.0],
        "year" => [2000i64, 2001, 2002],
    }
    .unwrap();

    let err = fit_model(&df, &spec("neg", Family::Poisson, "val ~ year")).unwrap_err();
    assert!(matches!(err, ModelError::NegativeCount { row: 1, .. }));
}

#[test]
fn test_f_test_for_single_added_term_equals_t_squared() {
    let df = design_frame("log_mortality_per_100k", |older, _, year, g| {
        1.0 + 0.5 * older as i32 as f64 + 0.02 * year as f64 + 0.3 * g + (((year * 13) % 5) as f64) * 0.1
    });
    let reduced = fit_model(&df, &spec("A", Family::Gaussian, "log_mortality_per_100k ~ age_name + year")).unwrap();
    let full = fit_model(
        &df,
        &spec("B", Family::Gaussian, "log_mortality_per_100k ~ age_name + year + gdp_per_capita"),
    )
    .unwrap();

    let cmp = compare_models(&reduced, &full).unwrap();
    let t = full.coefficient("gdp_per_capita").unwrap().coefficient.statistic.unwrap();
    let t_p = full.coefficient("gdp_per_capita").unwrap().coefficient.p_value.unwrap();

    assert_eq!(cmp.df_difference(), 1);
    assert!((cmp.statistic - t * t).abs() < 1e-6 * t * t);
    assert!((cmp.p_value - t_p).abs() < 1e-8);
}

#[test]
fn test_likelihood_ratio_test_uses_deviance_difference() {
    let df = design_frame("val", |older, female, year, _| {
        (20.0 + 15.0 * older as i32 as f64 + 4.0 * female as i32 as f64 + (year % 4) as f64).round()
    });
    let reduced = fit_model(&df, &spec("A", Family::Poisson, "val ~ age_name")).unwrap();
    let full = fit_model(&df, &spec("B", Family::Poisson, "val ~ age_name + sex_name")).unwrap();

    let cmp = compare_models(&reduced, &full).unwrap();

    let dev = |fit: &ModelFit| match fit.statistics {
        FitStatistics::Poisson { deviance, .. } => deviance,
        _ => unreachable!(),
    };
    assert!((cmp.statistic - (dev(&reduced) - dev(&full))).abs() < 1e-9);
    assert!(cmp.statistic > 0.0);
    assert!(cmp.p_value > 0.0 && cmp.p_value < 1.0);
}

#[test]
fn test_comparison_across_families_fails() {
    let df = design_frame("val", |_, female, _, _| 10.0 + female as i32 as f64);
    let gaussian = fit_model(&df, &spec("A", Family::Gaussian, "val ~ age_name")).unwrap();
    let poisson = fit_model(&df, &spec("B", Family::Poisson, "val ~ age_name + sex_name")).unwrap();

    assert!(matches!(
        compare_models(&gaussian, &poisson),
        Err(ModelError::IncompatibleModels { .. })
    ));
}
