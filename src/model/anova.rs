//! Nested model comparison: F test for least-squares fits, likelihood-ratio
//! chi-square for Poisson fits

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use super::error::ModelError;
use super::fit::{FitStatistics, ModelFit};
use super::formula::Family;

/// Analysis-of-deviance row for a (reduced, full) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaComparison {
    pub reduced: String,
    pub full: String,
    pub family: Family,
    pub df_reduced: usize,
    pub df_full: usize,
    /// Residual sum of squares (Gaussian) or deviance (Poisson) of the reduced model
    pub residual_reduced: f64,
    pub residual_full: f64,
    /// F statistic (Gaussian) or chi-square statistic (Poisson)
    pub statistic: f64,
    pub p_value: f64,
}

impl AnovaComparison {
    /// Parameters added by the full model
    pub fn df_difference(&self) -> usize {
        self.df_reduced - self.df_full
    }
}

/// Compare two fits of the same family on the same rows, `reduced` nested in `full`
pub fn compare_models(reduced: &ModelFit, full: &ModelFit) -> Result<AnovaComparison, ModelError> {
    let incompatible = |reason: String| ModelError::IncompatibleModels {
        reduced: reduced.name.clone(),
        full: full.name.clone(),
        reason,
    };

    if reduced.family != full.family {
        return Err(incompatible(format!(
            "families differ ({} vs {})",
            reduced.family, full.family
        )));
    }
    if reduced.n_obs != full.n_obs {
        return Err(incompatible(format!(
            "fitted on different rows ({} vs {} observations)",
            reduced.n_obs, full.n_obs
        )));
    }

    let df_reduced = reduced.statistics.df_residual();
    let df_full = full.statistics.df_residual();
    if df_reduced <= df_full {
        return Err(incompatible(format!(
            "full model must have fewer residual degrees of freedom ({} vs {})",
            df_reduced, df_full
        )));
    }
    let df_diff = (df_reduced - df_full) as f64;

    let residual_reduced = reduced.statistics.residual_measure();
    let residual_full = full.statistics.residual_measure();

    let (statistic, p_value) = match &full.statistics {
        FitStatistics::Gaussian { .. } => {
            if df_full == 0 {
                return Err(incompatible("full model has no residual degrees of freedom".to_string()));
            }
            let f = ((residual_reduced - residual_full) / df_diff) / (residual_full / df_full as f64);
            let dist = FisherSnedecor::new(df_diff, df_full as f64).map_err(|e| ModelError::Distribution(e.to_string()))?;
            (f, dist.sf(f))
        }
        FitStatistics::Poisson { .. } => {
            let chi_sq = residual_reduced - residual_full;
            let dist = ChiSquared::new(df_diff).map_err(|e| ModelError::Distribution(e.to_string()))?;
            (chi_sq, dist.sf(chi_sq))
        }
    };

    Ok(AnovaComparison {
        reduced: reduced.name.clone(),
        full: full.name.clone(),
        family: full.family,
        df_reduced,
        df_full,
        residual_reduced,
        residual_full,
        statistic,
        p_value,
    })
}
