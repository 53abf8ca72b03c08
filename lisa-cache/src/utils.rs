use std::env;
use std::path::PathBuf;

use dirs::home_dir;

use super::consts::{DEFAULT_CACHE_FOLDER, DEFAULT_REMOTE_TEMPLATE, LISA_CACHE_ENV, LISA_REMOTE_ENV};

/// Get default cache folder from environment variable, if not available then create it in home folder
///
/// # Returns
/// - path to cache folder
pub fn get_default_cache_folder() -> PathBuf {
    if let Ok(val) = env::var(LISA_CACHE_ENV) {
        PathBuf::from(val)
    } else {
        let home = env::var("HOME")
            .or_else(|_| {
                home_dir()
                    .map(|p| p.to_string_lossy().into_owned())
                    .ok_or(env::VarError::NotPresent)
            })
            .unwrap_or_else(|_| "/tmp".to_string());

        let mut path = PathBuf::from(home);
        path.push(DEFAULT_CACHE_FOLDER);
        path
    }
}

/// Get default remote URL template from environment variable
pub fn get_default_remote_template() -> String {
    env::var(LISA_REMOTE_ENV).unwrap_or_else(|_| DEFAULT_REMOTE_TEMPLATE.to_string())
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(path: PathBuf) -> PathBuf {
    let raw = path.to_string_lossy().into_owned();
    let expanded = shellexpand::full(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw);
    PathBuf::from(expanded)
}
