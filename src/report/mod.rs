//! Report module - terminal tables, histograms and output files

pub mod export;
pub mod histogram;
pub mod summary;

pub use export::*;
pub use histogram::*;
pub use summary::*;
