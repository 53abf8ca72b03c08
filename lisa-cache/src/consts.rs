//! Constants for the resource cache: environment variables, layout and defaults.

/// Environment variable name for setting the cache directory location.
///
/// When set, this overrides the default cache location (`~/.lisa_cache/`).
///
/// # Example
///
/// ```bash
/// export LISA_CACHE=/custom/cache/path
/// ```
pub const LISA_CACHE_ENV: &str = "LISA_CACHE";

/// Environment variable name for overriding the remote URL template.
pub const LISA_REMOTE_ENV: &str = "LISA_REMOTE";

/// Default cache folder name, created in the home folder.
pub const DEFAULT_CACHE_FOLDER: &str = ".lisa_cache/";

/// Remote location of RP maps. `{species}`, `{version}` and `{name}` are filled in per request.
pub const DEFAULT_REMOTE_TEMPLATE: &str =
    "http://cistrome.org/~alynch/data/lisa_data/{species}_{version}/rp_maps/{name}.mtx.gz";

/// RP map style every species ships with, used when a requested style can't be fetched.
pub const DEFAULT_RESOURCE_NAME: &str = "basic";

/// File extension of cached RP maps (Matrix Market).
pub const DEFAULT_RESOURCE_EXT: &str = ".mtx";

/// Suffix of partially downloaded files; renamed into place once complete.
pub const PARTIAL_DOWNLOAD_EXT: &str = ".part";
