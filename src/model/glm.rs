//! Poisson regression with a log link, fitted by iteratively reweighted least squares

use log::{debug, warn};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::gamma::ln_gamma;

use super::design::DesignMatrix;
use super::error::ModelError;
use super::fit::{Coefficient, FitStatistics};
use super::least_squares::{weighted_least_squares, LeastSquares};

/// Maximum IRLS iterations
pub const MAX_ITERATIONS: usize = 25;

/// Relative deviance change below which IRLS stops
pub const CONVERGENCE_EPSILON: f64 = 1e-8;

pub(crate) fn fit_poisson(design: &DesignMatrix, y: &[f64]) -> Result<(Vec<Coefficient>, FitStatistics), ModelError> {
    let n = design.nrows();

    if let Some((row, value)) = y.iter().enumerate().find(|(_, v)| **v < 0.0) {
        return Err(ModelError::NegativeCount { row, value: *value });
    }
    let non_integer = y.iter().filter(|v| v.fract() != 0.0).count();
    if non_integer > 0 {
        warn!("{} Poisson outcomes are not whole numbers; fitting as quasi-counts", non_integer);
    }

    let mut mu: Vec<f64> = y.iter().map(|v| v + 0.1).collect();
    let mut eta: Vec<f64> = mu.iter().map(|m| m.ln()).collect();
    let mut deviance_old = poisson_deviance(y, &mu);

    let mut converged = false;
    let mut iterations = 0;
    let mut last: Option<LeastSquares> = None;

    while iterations < MAX_ITERATIONS {
        iterations += 1;

        // Working response and weights for the log link: dmu/deta = mu
        let z: Vec<f64> = eta
            .iter()
            .zip(&mu)
            .zip(y)
            .map(|((e, m), y)| e + (y - m) / m)
            .collect();
        let ls = weighted_least_squares(&design.x, &z, Some(mu.as_slice()))?;

        eta = ls.linear_predictor(&design.x);
        mu = eta.iter().map(|e| e.exp()).collect();
        last = Some(ls);

        let deviance = poisson_deviance(y, &mu);
        debug!("IRLS iteration {}: deviance {:.6}", iterations, deviance);

        if ((deviance - deviance_old).abs() / (deviance.abs() + 0.1)) < CONVERGENCE_EPSILON {
            converged = true;
            break;
        }
        deviance_old = deviance;
    }

    if !converged {
        warn!("Poisson fit did not converge after {} iterations", iterations);
    }

    let ls = last.ok_or(ModelError::EmptyDesign)?;
    let rank = ls.rank();
    let normal = Normal::new(0.0, 1.0).map_err(|e| ModelError::Distribution(e.to_string()))?;
    let coefficients = design
        .column_names
        .iter()
        .enumerate()
        .map(|(j, term)| {
            let estimate = ls.coefficients[j];
            let std_error = ls.unscaled_variance(j).map(f64::sqrt).filter(|se| se.is_finite());
            let statistic = match (estimate, std_error) {
                (Some(b), Some(se)) if se > 0.0 => Some(b / se),
                _ => None,
            };
            let p_value = statistic.map(|z| 2.0 * normal.sf(z.abs()));
            Coefficient {
                term: term.clone(),
                estimate,
                std_error,
                statistic,
                p_value,
            }
        })
        .collect();

    let deviance = poisson_deviance(y, &mu);
    let mean = y.iter().sum::<f64>() / n as f64;
    let null_deviance = poisson_deviance(y, &vec![mean; n]);
    let log_likelihood: f64 = y
        .iter()
        .zip(&mu)
        .map(|(y, m)| {
            let y_log_mu = if *y > 0.0 { y * m.ln() } else { 0.0 };
            y_log_mu - m - ln_gamma(y + 1.0)
        })
        .sum();

    let statistics = FitStatistics::Poisson {
        deviance,
        null_deviance,
        df_residual: n - rank,
        df_null: n.saturating_sub(1),
        rank,
        aic: -2.0 * log_likelihood + 2.0 * rank as f64,
        iterations,
        converged,
    };

    Ok((coefficients, statistics))
}

/// `2 * sum(y log(y / mu) - (y - mu))`, with `y log y` taken as 0 at `y = 0`
pub fn poisson_deviance(y: &[f64], mu: &[f64]) -> f64 {
    2.0 * y
        .iter()
        .zip(mu)
        .map(|(y, m)| {
            let ratio_term = if *y > 0.0 { y * (y / m).ln() } else { 0.0 };
            ratio_term - (y - m)
        })
        .sum::<f64>()
}
