//! Ordinary least squares with t-tests and overall fit statistics

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use super::design::{DesignMatrix, INTERCEPT};
use super::error::ModelError;
use super::fit::{Coefficient, FitStatistics};
use super::least_squares::weighted_least_squares;

pub(crate) fn fit_ols(design: &DesignMatrix, y: &[f64]) -> Result<(Vec<Coefficient>, FitStatistics), ModelError> {
    let n = design.nrows();
    let ls = weighted_least_squares(&design.x, y, None)?;
    let rank = ls.rank();

    let df_residual = n - rank;
    let sigma_sq = if df_residual > 0 {
        ls.rss / df_residual as f64
    } else {
        f64::NAN
    };

    let t_dist = if df_residual > 0 {
        Some(StudentsT::new(0.0, 1.0, df_residual as f64).map_err(|e| ModelError::Distribution(e.to_string()))?)
    } else {
        None
    };

    let coefficients = design
        .column_names
        .iter()
        .enumerate()
        .map(|(j, term)| {
            let estimate = ls.coefficients[j];
            let std_error = ls
                .unscaled_variance(j)
                .map(|v| (v * sigma_sq).sqrt())
                .filter(|se| se.is_finite());
            let statistic = match (estimate, std_error) {
                (Some(b), Some(se)) if se > 0.0 => Some(b / se),
                _ => None,
            };
            let p_value = match (statistic, &t_dist) {
                (Some(t), Some(dist)) => Some(2.0 * dist.sf(t.abs())),
                _ => None,
            };
            Coefficient {
                term: term.clone(),
                estimate,
                std_error,
                statistic,
                p_value,
            }
        })
        .collect();

    let has_intercept = ls.kept.first() == Some(&0) && design.column_names.first().map(String::as_str) == Some(INTERCEPT);
    let tss = total_sum_of_squares(y, has_intercept);
    let r_squared = if tss > 0.0 { 1.0 - ls.rss / tss } else { f64::NAN };

    let df_model = if has_intercept { rank - 1 } else { rank };
    let intercept_df = usize::from(has_intercept);
    let adj_r_squared = if df_residual > 0 {
        1.0 - (1.0 - r_squared) * ((n - intercept_df) as f64 / df_residual as f64)
    } else {
        f64::NAN
    };

    let (f_statistic, f_p_value) = if df_model > 0 && df_residual > 0 {
        let f = ((tss - ls.rss) / df_model as f64) / sigma_sq;
        let p = FisherSnedecor::new(df_model as f64, df_residual as f64)
            .map(|dist| dist.sf(f))
            .ok();
        (Some(f), p)
    } else {
        (None, None)
    };

    let statistics = FitStatistics::Gaussian {
        rss: ls.rss,
        df_residual,
        rank,
        sigma: sigma_sq.sqrt(),
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
    };

    Ok((coefficients, statistics))
}

fn total_sum_of_squares(y: &[f64], centered: bool) -> f64 {
    let mean = if centered {
        y.iter().sum::<f64>() / y.len() as f64
    } else {
        0.0
    };
    y.iter().map(|v| (v - mean).powi(2)).sum()
}
