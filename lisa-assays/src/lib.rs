//! # lisa assays
//!
//! Estimates the influence of regulatory factors on a gene set. Factor
//! binding profiles are aligned against a regulatory-potential map, scored
//! by a sorted set of assays and merged into one ranked [lisa_core::ResultsTable].
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use lisa_assays::config::LisaConfig;
//! use lisa_assays::loader::{build_resolver, load_data};
//! use lisa_assays::scheduler::LisaRun;
//! use lisa_core::RunLog;
//!
//! # fn main() -> Result<(), lisa_assays::errors::PipelineError> {
//! let config = LisaConfig::default();
//! let resolver = build_resolver(&config.cache)?;
//! let mut log = RunLog::new();
//! let data = load_data(&resolver, &config, "hg38", Path::new("data/hg38"), &mut log)?;
//!
//! let query = vec!["GATA1", "MYC", "SPI1"];
//! let mut run = LisaRun::new(&config, &data)?.with_log(log);
//! let (results, metadata) = run.predict(&query, &[])?;
//! println!("{}", results.to_delimited(200));
//! # Ok(())
//! # }
//! ```
pub mod assays;
pub mod background;
pub mod config;
pub mod errors;
pub mod loader;
pub mod models;
pub mod report;
pub mod scheduler;
pub mod stats;

pub use assays::{Assay, AssayHandle, AssayKind, AssayResult};
pub use config::LisaConfig;
pub use report::RunMetadata;
pub use scheduler::{LisaRun, RunState, WorkerBudget, compute_worker_budget};
