//! Pipeline module - load, merge and derive the regression table

pub mod features;
pub mod loader;
pub mod merge;
pub mod schema;

pub use features::*;
pub use loader::*;
pub use merge::*;
pub use schema::SchemaError;
