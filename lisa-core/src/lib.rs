//! # Core data model for lisa.
//!
//! This crate holds the pieces every part of a lisa run shares:
//!
//! - [models]: gene catalogs, factor metadata, ragged per-sample profiles and the run data bundle
//! - [sparse]: assembly of sparse matrices from ragged per-column data
//! - [alignment]: alignment of factor names onto the rows of an RP map
//! - [results]: the column-addressable results table
//! - [runlog]: the ordered, hierarchical log of a run
//! - [io]: readers for the files of a species data directory
//!
pub mod alignment;
pub mod consts;
pub mod errors;
pub mod io;
pub mod models;
pub mod results;
pub mod runlog;
pub mod sparse;
pub mod utils;

// re-exports
pub use alignment::FactorAlignment;
pub use errors::*;
pub use results::{ColumnRef, Position, ResultsTable, Value};
pub use runlog::RunLog;
