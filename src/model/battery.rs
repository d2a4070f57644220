//! Fits a list of model specs in parallel and compares nested pairs

use anyhow::Result;
use log::{info, warn};
use polars::prelude::DataFrame;
use rayon::prelude::*;

use super::anova::{compare_models, AnovaComparison};
use super::error::ModelError;
use super::fit::{fit_model, ModelFit};
use super::formula::ModelSpec;
use crate::pipeline::features::ZeroMortalityPolicy;
use crate::pipeline::schema::LOG_MORTALITY_PER_100K;

/// Fit every spec against the featured table, returning results in spec order.
///
/// `policy` is applied once and used for every model whose response is log
/// mortality; other models see the table unchanged. A failing model does not
/// stop the others, but a policy that cannot be applied fails the battery.
pub fn run_battery(
    featured: &DataFrame,
    specs: &[ModelSpec],
    policy: ZeroMortalityPolicy,
) -> Result<Vec<Result<ModelFit, ModelError>>> {
    let (log_ready, affected) = policy.apply(featured)?;
    if affected > 0 {
        info!("Zero-mortality policy '{}' affects {} rows", policy, affected);
    }

    let results: Vec<Result<ModelFit, ModelError>> = specs
        .par_iter()
        .map(|spec| {
            let data = if spec.formula.response == LOG_MORTALITY_PER_100K {
                &*log_ready
            } else {
                featured
            };
            fit_model(data, spec)
        })
        .collect();

    for (spec, result) in specs.iter().zip(&results) {
        if let Err(e) = result {
            warn!("Model '{}' failed: {}", spec.name, e);
        }
    }

    Ok(results)
}

/// Compare each `(reduced, full)` pair whose two models were both fitted.
///
/// Pairs naming a model that is absent from `fits` are skipped.
pub fn compare_battery(
    fits: &[ModelFit],
    pairs: &[(String, String)],
) -> Vec<Result<AnovaComparison, ModelError>> {
    let find = |name: &str| fits.iter().find(|f| f.name == name);

    pairs
        .iter()
        .filter_map(|(reduced, full)| match (find(reduced), find(full)) {
            (Some(r), Some(f)) => Some(compare_models(r, f)),
            _ => {
                warn!("Skipping comparison {} -> {}: model not fitted", reduced, full);
                None
            }
        })
        .collect()
}
