//! Design matrix construction with reference-level coding
//!
//! Column naming follows the usual R conventions so coefficient tables read
//! the same way: `(Intercept)`, `year`, `sex_nameMale`, `year:year_20041`,
//! `age_name10-24 years:sex_nameMale`.

use faer::Mat;

use super::error::ModelError;
use super::formula::{Formula, Term, Variable};
use super::frame::{FrameColumn, ModelFrame};

pub const INTERCEPT: &str = "(Intercept)";

/// Dense model matrix plus one name per column
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub x: Mat<f64>,
    pub column_names: Vec<String>,
}

impl DesignMatrix {
    /// Expand `formula` over the rows of `frame`. The intercept is always the first column.
    pub fn build(frame: &ModelFrame, formula: &Formula, model: &str) -> Result<Self, ModelError> {
        let n = frame.n_rows();
        let mut columns: Vec<(String, Vec<f64>)> = vec![(INTERCEPT.to_string(), vec![1.0; n])];

        for term in &formula.terms {
            match term {
                Term::Main(v) => columns.extend(contrast_columns(frame, v, model)?),
                Term::Interaction(a, b) => {
                    let left = contrast_columns(frame, a, model)?;
                    let right = contrast_columns(frame, b, model)?;
                    // First variable varies fastest
                    for (right_name, right_values) in &right {
                        for (left_name, left_values) in &left {
                            let values = left_values
                                .iter()
                                .zip(right_values)
                                .map(|(l, r)| l * r)
                                .collect();
                            columns.push((format!("{}:{}", left_name, right_name), values));
                        }
                    }
                }
            }
        }

        let x = Mat::from_fn(n, columns.len(), |i, j| columns[j].1[i]);
        let column_names = columns.into_iter().map(|(name, _)| name).collect();

        Ok(Self { x, column_names })
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }
}

/// Columns contributed by a single variable: itself when numeric, one
/// 0/1 indicator per non-baseline level when a factor.
fn contrast_columns(
    frame: &ModelFrame,
    variable: &Variable,
    model: &str,
) -> Result<Vec<(String, Vec<f64>)>, ModelError> {
    let column = frame
        .column(&variable.name)
        .ok_or_else(|| ModelError::MissingVariable {
            model: model.to_string(),
            variable: variable.name.clone(),
        })?;

    Ok(match column {
        FrameColumn::Numeric(values) => vec![(variable.name.clone(), values.clone())],
        FrameColumn::Factor(factor) => factor
            .levels
            .iter()
            .enumerate()
            .skip(1)
            .map(|(level_idx, level)| {
                let indicator = factor
                    .codes
                    .iter()
                    .map(|code| if *code == Some(level_idx) { 1.0 } else { 0.0 })
                    .collect();
                (format!("{}{}", variable.name, level), indicator)
            })
            .collect(),
    })
}
