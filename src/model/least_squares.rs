//! Weighted least squares with in-order alias detection
//!
//! A first unpivoted QR of the weighted design screens columns left to
//! right: `|R_jj|` is the norm of column `j` after removing its projection
//! on the columns before it, so a column whose `|R_jj|` falls below
//! `ALIAS_TOLERANCE` times its original norm is linearly dependent on them
//! and its coefficient is reported as not identifiable. The estimable
//! columns are then factored again and solved with faer's triangular routines.

use faer::linalg::triangular_solve::solve_upper_triangular_in_place;
use faer::{Mat, Parallelism};

use super::error::ModelError;

/// Relative tolerance for declaring a column aliased
pub const ALIAS_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// One entry per design column; `None` for aliased columns
    pub coefficients: Vec<Option<f64>>,
    /// Indices of the estimable (non-aliased) columns, in order
    pub kept: Vec<usize>,
    /// `(X'WX)^-1` restricted to the kept columns
    pub unscaled_covariance: Mat<f64>,
    /// Weighted residual sum of squares
    pub rss: f64,
}

impl LeastSquares {
    pub fn rank(&self) -> usize {
        self.kept.len()
    }

    /// Unscaled variance of a design column's estimate, if it was estimable
    pub fn unscaled_variance(&self, column: usize) -> Option<f64> {
        let k = self.kept.iter().position(|&c| c == column)?;
        Some(self.unscaled_covariance[(k, k)])
    }

    /// Linear predictor `X b` using only estimable columns
    pub fn linear_predictor(&self, x: &Mat<f64>) -> Vec<f64> {
        (0..x.nrows())
            .map(|i| {
                self.kept
                    .iter()
                    .map(|&j| x[(i, j)] * self.coefficients[j].unwrap_or(0.0))
                    .sum()
            })
            .collect()
    }
}

/// Minimize `sum w_i (y_i - x_i b)^2`. Unit weights when `weights` is `None`.
pub fn weighted_least_squares(
    x: &Mat<f64>,
    y: &[f64],
    weights: Option<&[f64]>,
) -> Result<LeastSquares, ModelError> {
    let n = x.nrows();
    let p = x.ncols();

    if p == 0 {
        return Err(ModelError::EmptyDesign);
    }

    let sqrt_w: Vec<f64> = match weights {
        Some(w) => w.iter().map(|w| w.max(0.0).sqrt()).collect(),
        None => vec![1.0; n],
    };
    let xw = Mat::from_fn(n, p, |i, j| x[(i, j)] * sqrt_w[i]);
    let yw = Mat::from_fn(n, 1, |i, _| y[i] * sqrt_w[i]);

    let kept = estimable_columns(&xw);
    let rank = kept.len();
    if rank == 0 {
        return Err(ModelError::EmptyDesign);
    }

    let xk = Mat::from_fn(n, rank, |i, c| xw[(i, kept[c])]);
    let qr = xk.qr();
    let q = qr.compute_thin_q();
    let r = qr.compute_thin_r();

    // R b = Q'y
    let mut beta = q.transpose() * &yw;
    solve_upper_triangular_in_place(r.as_ref(), beta.as_mut(), Parallelism::None);

    // (X'WX)^-1 = R^-1 R^-T
    let mut r_inv = Mat::<f64>::identity(rank, rank);
    solve_upper_triangular_in_place(r.as_ref(), r_inv.as_mut(), Parallelism::None);
    let unscaled_covariance = &r_inv * r_inv.transpose();

    let fitted = &xk * &beta;
    let rss: f64 = (0..n).map(|i| (yw[(i, 0)] - fitted[(i, 0)]).powi(2)).sum();

    let mut coefficients = vec![None; p];
    for (c, &j) in kept.iter().enumerate() {
        coefficients[j] = Some(beta[(c, 0)]);
    }

    Ok(LeastSquares {
        coefficients,
        kept,
        unscaled_covariance,
        rss,
    })
}

/// Columns of `xw` that are not linear combinations of the columns before them.
/// Only the first `min(n, p)` columns have a diagonal entry in `R`; any later
/// column is reported as aliased.
fn estimable_columns(xw: &Mat<f64>) -> Vec<usize> {
    let r = xw.qr().compute_thin_r();
    let screened = xw.ncols().min(r.nrows());

    (0..screened)
        .filter(|&j| {
            let norm = xw.col(j).norm_l2();
            norm > 0.0 && r[(j, j)].abs() > ALIAS_TOLERANCE * norm
        })
        .collect()
}
