//! Regression models: formulas, design matrices, fitting and comparison

pub mod anova;
pub mod battery;
pub mod design;
pub mod error;
pub mod fit;
pub mod formula;
pub mod frame;
pub mod glm;
pub mod least_squares;
pub mod ols;

pub use anova::{compare_models, AnovaComparison};
pub use battery::{compare_battery, run_battery};
pub use design::{DesignMatrix, INTERCEPT};
pub use error::ModelError;
pub use fit::{fit_model, Coefficient, CoefficientRow, FitStatistics, ModelFit};
pub use formula::{
    standard_battery, standard_comparisons, Covariates, Family, Formula, FormulaBuilder, ModelSpec,
    Outcome, Term, Variable, VariableKind,
};
pub use frame::{FrameColumn, ModelFrame};
