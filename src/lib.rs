//! hivstat: HIV mortality regression library
//!
//! Loads the HIV deaths, GDP per capita and population tables, merges them on
//! country and year, derives mortality features and fits a battery of linear
//! and Poisson regressions.

pub mod cli;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;
