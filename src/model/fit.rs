//! Fitted model results and the single entry point for fitting one spec

use log::info;
use polars::prelude::DataFrame;
use serde::Serialize;

use super::design::DesignMatrix;
use super::error::ModelError;
use super::formula::{Family, ModelSpec};
use super::frame::ModelFrame;
use super::glm::fit_poisson;
use super::ols::fit_ols;

/// One estimated term. `None` fields mark an aliased (not identifiable) term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: Option<f64>,
    pub std_error: Option<f64>,
    /// t statistic for Gaussian fits, z statistic for Poisson fits
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
}

/// A coefficient table row as reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    #[serde(flatten)]
    pub coefficient: Coefficient,
    /// `exp(estimate)` for log-scale models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_estimate: Option<f64>,
}

impl CoefficientRow {
    /// Percentage change in the outcome per unit of the term, `(exp(b) - 1) * 100`
    pub fn percent_change(&self) -> Option<f64> {
        self.exp_estimate.map(|e| (e - 1.0) * 100.0)
    }
}

/// Whole-model statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FitStatistics {
    Gaussian {
        rss: f64,
        df_residual: usize,
        rank: usize,
        /// Residual standard error
        sigma: f64,
        r_squared: f64,
        adj_r_squared: f64,
        f_statistic: Option<f64>,
        f_p_value: Option<f64>,
    },
    Poisson {
        deviance: f64,
        null_deviance: f64,
        df_residual: usize,
        df_null: usize,
        rank: usize,
        aic: f64,
        iterations: usize,
        converged: bool,
    },
}

impl FitStatistics {
    pub fn df_residual(&self) -> usize {
        match self {
            FitStatistics::Gaussian { df_residual, .. } | FitStatistics::Poisson { df_residual, .. } => {
                *df_residual
            }
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            FitStatistics::Gaussian { rank, .. } | FitStatistics::Poisson { rank, .. } => *rank,
        }
    }

    /// RSS for Gaussian fits, residual deviance for Poisson fits
    pub fn residual_measure(&self) -> f64 {
        match self {
            FitStatistics::Gaussian { rss, .. } => *rss,
            FitStatistics::Poisson { deviance, .. } => *deviance,
        }
    }
}

/// A fitted model
#[derive(Debug, Clone, Serialize)]
pub struct ModelFit {
    pub name: String,
    pub formula: String,
    pub family: Family,
    /// Complete-case rows used by the fit
    pub n_obs: usize,
    /// Rows excluded for missing or non-finite values
    pub n_dropped: usize,
    pub coefficients: Vec<CoefficientRow>,
    pub statistics: FitStatistics,
}

impl ModelFit {
    pub fn coefficient(&self, term: &str) -> Option<&CoefficientRow> {
        self.coefficients.iter().find(|c| c.coefficient.term == term)
    }

    /// Terms whose coefficients could not be estimated
    pub fn aliased_terms(&self) -> Vec<&str> {
        self.coefficients
            .iter()
            .filter(|c| c.coefficient.estimate.is_none())
            .map(|c| c.coefficient.term.as_str())
            .collect()
    }
}

/// Fit `spec` on the complete cases of `df`
pub fn fit_model(df: &DataFrame, spec: &ModelSpec) -> Result<ModelFit, ModelError> {
    let frame = ModelFrame::from_dataframe(df, &spec.formula, &spec.name)?;
    let design = DesignMatrix::build(&frame, &spec.formula, &spec.name)?;

    let (coefficients, statistics) = match spec.family {
        Family::Gaussian => fit_ols(&design, &frame.response)?,
        Family::Poisson => fit_poisson(&design, &frame.response)?,
    };

    let log_scale = spec.is_log_scale();
    let coefficients: Vec<CoefficientRow> = coefficients
        .into_iter()
        .map(|coefficient| CoefficientRow {
            exp_estimate: if log_scale {
                coefficient.estimate.map(f64::exp)
            } else {
                None
            },
            coefficient,
        })
        .collect();

    let fit = ModelFit {
        name: spec.name.clone(),
        formula: spec.formula.to_string(),
        family: spec.family,
        n_obs: frame.n_rows(),
        n_dropped: frame.dropped_rows,
        coefficients,
        statistics,
    };

    let aliased = fit.aliased_terms();
    if !aliased.is_empty() {
        info!("Model '{}': {} aliased terms reported as NA", fit.name, aliased.len());
    }

    Ok(fit)
}
