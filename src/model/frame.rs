//! Complete-case model frames
//!
//! A model frame holds only the rows where the response and every covariate a
//! formula reads are present and finite. Factor levels are resolved on those
//! rows, so a level that never survives the filter gets no dummy column.

use log::debug;
use polars::prelude::*;

use super::error::ModelError;
use super::formula::{Formula, VariableKind};
use crate::pipeline::features::{column_labels, level_order, Factor};

#[derive(Debug, Clone)]
pub enum FrameColumn {
    Numeric(Vec<f64>),
    Factor(Factor),
}

#[derive(Debug, Clone)]
pub struct ModelFrame {
    pub response: Vec<f64>,
    pub columns: Vec<(String, FrameColumn)>,
    /// Rows excluded for a null or non-finite value
    pub dropped_rows: usize,
}

enum RawColumn {
    Numeric(Vec<Option<f64>>),
    Labels(Vec<Option<String>>),
}

impl ModelFrame {
    /// Select the complete cases of `df` for `formula`
    pub fn from_dataframe(df: &DataFrame, formula: &Formula, model: &str) -> Result<Self, ModelError> {
        let variables = formula.variables();
        let mut raw: Vec<(String, RawColumn)> = Vec::with_capacity(variables.len());

        for variable in &variables {
            let missing = || ModelError::MissingVariable {
                model: model.to_string(),
                variable: variable.name.clone(),
            };
            let column = match variable.kind {
                VariableKind::Numeric => {
                    let values = df
                        .column(&variable.name)
                        .and_then(|c| c.cast(&DataType::Float64))
                        .map_err(|_| missing())?;
                    let values = values.f64().map_err(|_| missing())?;
                    RawColumn::Numeric(values.into_iter().collect())
                }
                VariableKind::Factor => {
                    RawColumn::Labels(column_labels(df, &variable.name).map_err(|_| missing())?)
                }
            };
            raw.push((variable.name.clone(), column));
        }

        let keep: Vec<bool> = (0..df.height())
            .map(|row| {
                raw.iter().all(|(_, column)| match column {
                    RawColumn::Numeric(values) => values[row].is_some_and(f64::is_finite),
                    RawColumn::Labels(labels) => labels[row].is_some(),
                })
            })
            .collect();
        let kept = keep.iter().filter(|k| **k).count();

        if kept == 0 {
            return Err(ModelError::NoObservations {
                model: model.to_string(),
                formula: formula.to_string(),
            });
        }

        let mut raw = raw.into_iter();
        let mut response = Vec::with_capacity(kept);
        let mut columns = Vec::with_capacity(variables.len() - 1);

        // The first variable is always the response
        if let Some((_, RawColumn::Numeric(values))) = raw.next() {
            response = filter_rows(&values, &keep).into_iter().flatten().collect();
        }

        for (name, column) in raw {
            let column = match column {
                RawColumn::Numeric(values) => {
                    FrameColumn::Numeric(filter_rows(&values, &keep).into_iter().flatten().collect())
                }
                RawColumn::Labels(labels) => {
                    let labels = filter_rows(&labels, &keep);
                    FrameColumn::Factor(Factor::from_labels(&name, &labels, level_order(&name))?)
                }
            };
            columns.push((name, column));
        }

        let dropped_rows = df.height() - kept;
        debug!("Model '{}': {} complete rows, {} dropped", model, kept, dropped_rows);

        Ok(Self {
            response,
            columns,
            dropped_rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.response.len()
    }

    pub fn column(&self, name: &str) -> Option<&FrameColumn> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

fn filter_rows<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(v, _)| v.clone())
        .collect()
}
