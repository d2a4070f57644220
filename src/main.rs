//! hivstat: HIV mortality regression CLI
//!
//! Merges HIV deaths with GDP per capita and population, derives mortality
//! per 100,000 and fits linear and Poisson regressions of mortality on age,
//! sex, year, GDP and country.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use hivstat::cli::{display_path, load_and_merge, run_merge, Cli, Commands, SourcePaths};
use hivstat::model::{
    compare_battery, run_battery, standard_battery, standard_comparisons, AnovaComparison, ModelFit,
};
use hivstat::pipeline::{cast_categoricals, derive_features};
use hivstat::pipeline::schema::{LOG_MORTALITY_PER_100K, MORTALITY_PER_100K};
use hivstat::report::{
    display_comparison, display_fit, export_results, write_maindata, ExportParams, FailedModel,
    Histogram, RunResults, RunSummary,
};
use hivstat::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    ConfigCard,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Merge {
                deaths,
                gdp,
                population,
                output,
                wide,
            } => {
                let sources = SourcePaths {
                    deaths: deaths.clone(),
                    gdp: gdp.clone(),
                    population: population.clone(),
                };
                run_merge(&sources, &wide.load_options()?, output)
            }
        };
    }

    let sources = cli.sources()?;
    let options = cli.wide.load_options()?;
    let policy = cli.zero_mortality_policy();

    let (specs, pairs) = match cli.custom_model()? {
        Some(spec) => (vec![spec], Vec::new()),
        None => (standard_battery(), standard_comparisons()),
    };

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        deaths: &sources.deaths,
        gdp: &sources.gdp,
        population: &sources.population,
        output_dir: &cli.output_dir,
        first_year: options.first_year,
        last_year: options.last_year,
        policy,
        models: specs.len(),
    });

    // Step 1: Load and merge
    print_step_header(1, "Load and Merge");

    let step_start = Instant::now();
    let (mut maindata, merge_stats) = load_and_merge(&sources, &options)?;
    if merge_stats.unmatched_country_years > 0 {
        print_count(
            "country-year(s) without death records",
            merge_stats.unmatched_country_years,
            Some("(kept with null deaths)"),
        );
    }

    let maindata_path = cli.maindata_path();
    write_maindata(&mut maindata, &maindata_path)?;
    print_success(&format!("Merged table saved to {}", maindata_path.display()));
    print_step_time(step_start.elapsed());

    let mut summary = RunSummary::new(merge_stats.clone(), policy);
    summary.outputs.push(display_path(&maindata_path));

    // Step 2: Derived features
    print_step_header(2, "Derived Features");

    let step_start = Instant::now();
    let featured = derive_features(&maindata)?;
    let categoricals = cast_categoricals(&featured)?;
    print_info(&format!(
        "{} age groups, {} sexes, {} countries",
        categoricals.age.n_levels(),
        categoricals.sex.n_levels(),
        categoricals.country.n_levels()
    ));

    let histograms = vec![
        Histogram::from_column(&featured, MORTALITY_PER_100K, cli.histogram_bins)?,
        Histogram::from_column(&featured, LOG_MORTALITY_PER_100K, cli.histogram_bins)?,
    ];
    for histogram in &histograms {
        histogram.display();
    }

    summary.zero_mortality_rows = policy.affected_rows(&featured)?;
    if summary.zero_mortality_rows > 0 {
        print_count(
            "row(s) with zero mortality",
            summary.zero_mortality_rows,
            Some(&format!("(policy: {})", policy)),
        );
    }
    print_step_time(step_start.elapsed());

    // Step 3: Model fitting
    print_step_header(3, "Model Fitting");

    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Fitting {} model(s)...", specs.len()));
    let results = run_battery(&featured, &specs, policy)?;

    let mut fits: Vec<ModelFit> = Vec::with_capacity(results.len());
    let mut failures: Vec<FailedModel> = Vec::new();
    for (spec, result) in specs.iter().zip(results) {
        match result {
            Ok(fit) => fits.push(fit),
            Err(e) => failures.push(FailedModel {
                name: spec.name.clone(),
                error: e.to_string(),
            }),
        }
    }

    if failures.is_empty() {
        finish_with_success(&spinner, &format!("Fitted {} model(s)", fits.len()));
    } else {
        finish_with_warning(
            &spinner,
            &format!("Fitted {} model(s), {} failed", fits.len(), failures.len()),
        );
    }

    for fit in &fits {
        display_fit(fit);
    }
    print_step_time(step_start.elapsed());

    summary.models_fitted = fits.len();
    summary.models_failed = failures
        .iter()
        .map(|f| (f.name.clone(), f.error.clone()))
        .collect();

    // Step 4: Nested comparisons
    let mut comparisons: Vec<AnovaComparison> = Vec::new();
    if !pairs.is_empty() {
        print_step_header(4, "Nested Model Comparisons");

        for result in compare_battery(&fits, &pairs) {
            match result {
                Ok(cmp) => comparisons.push(cmp),
                Err(e) => println!("    {} {}", style("⚠").yellow(), e),
            }
        }
        display_comparison(&comparisons);
    }

    // Step 5: Export
    if !cli.no_export {
        let results_path = cli.results_path();
        let deaths_file = display_path(&sources.deaths);
        let gdp_file = display_path(&sources.gdp);
        let population_file = display_path(&sources.population);

        export_results(
            &results_path,
            &ExportParams {
                deaths_file: &deaths_file,
                gdp_file: &gdp_file,
                population_file: &population_file,
                header_rows: options.header_rows,
                first_year: options.first_year,
                last_year: options.last_year,
                policy,
            },
            &RunResults {
                merge: &merge_stats,
                fits: &fits,
                failures: &failures,
                comparisons: &comparisons,
                histograms: &histograms,
            },
        )?;
        println!();
        print_success(&format!("Model results saved to {}", results_path.display()));
        summary.outputs.push(display_path(&results_path));
    }

    summary.display();

    if fits.is_empty() {
        anyhow::bail!("No model could be fitted; see the failed models above");
    }

    print_completion();

    Ok(())
}
