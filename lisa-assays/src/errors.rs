use thiserror::Error;

use lisa_cache::errors::ResolverError;
use lisa_core::{CoreError, ShapeError, TableError};

use crate::scheduler::RunState;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Must provide at least one assay to run")]
    NoAssays,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("RP map must be one of the provided maps: {styles}. Got {name}")]
    UnknownRpMap { name: String, styles: String },

    #[error(transparent)]
    Assay(#[from] AssayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum AssayError {
    #[error("Invalid assay encountered: {0}")]
    InvalidAssay(String),

    #[error("No {0} profile found for dataset {1}")]
    MissingProfile(String, String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Can't move a run from {from:?} to {to:?}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid background: {0}")]
    InvalidBackground(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Assay(#[from] AssayError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
