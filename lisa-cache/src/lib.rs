//! # Resource cache for lisa data
//!
//! Resolves named, versioned artifacts (RP maps in particular) to files in a
//! local cache, fetching them from a remote when absent. Failed fetches of a
//! non-default artifact fall back once to the default one.
//!
//! The cache folder defaults to `~/.lisa_cache/` and can be moved with the
//! `LISA_CACHE` environment variable.
pub mod consts;
pub mod errors;
pub mod resolver;
pub mod transport;
pub mod utils;

pub use resolver::{Resolution, ResourceResolver, ResourceResolverBuilder, ResourceSpec};
pub use transport::{DirectoryTransport, HttpTransport, Transport};
