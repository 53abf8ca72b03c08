use thiserror::Error;

use crate::resolver::ResourceSpec;

/// Any failure to fetch an artifact from a remote. Callers treat every
/// variant the same way: the artifact is unavailable.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to GET {0}: {1}")]
    Request(String, String),

    #[error("Artifact not found at {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Resource unavailable after trying {}: {reason}", format_attempts(.attempted))]
    ResourceUnavailable {
        attempted: Vec<ResourceSpec>,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_attempts(attempted: &[ResourceSpec]) -> String {
    attempted
        .iter()
        .map(|spec| spec.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ResolverError>;
