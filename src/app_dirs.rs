//! Application directory helpers anchored to a single `.churnpal` folder.
//!
//! Log files live under the OS config directory unless `CHURNPAL_CONFIG_HOME` points elsewhere
//! (tests, containers, portable setups).

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".churnpal";

/// Environment variable overriding the config root.
pub const CONFIG_HOME_ENV: &str = "CHURNPAL_CONFIG_HOME";

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.churnpal` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

/// Return the logs directory inside the `.churnpal` root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("logs"))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn config_base_dir() -> Option<PathBuf> {
    resolve_base(std::env::var_os(CONFIG_HOME_ENV).map(PathBuf::from))
}

fn resolve_base(override_path: Option<PathBuf>) -> Option<PathBuf> {
    override_path
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn override_takes_precedence() {
        let base = tempdir().unwrap();
        let resolved = resolve_base(Some(base.path().to_path_buf())).unwrap();
        assert_eq!(resolved, base.path());
    }

    #[test]
    fn empty_override_is_ignored() {
        let resolved = resolve_base(Some(PathBuf::new()));
        assert_ne!(resolved, Some(PathBuf::new()));
    }

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let base = tempdir().unwrap();
        let nested = base.path().join(APP_DIR_NAME).join("logs");
        let created = ensure_dir(nested.clone()).unwrap();
        assert_eq!(created, nested);
        assert!(nested.is_dir());
    }
}
