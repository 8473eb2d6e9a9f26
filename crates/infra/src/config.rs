//! Configuration loading and representation.
//!
//! Resolved once at startup; operations never read the environment.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment key naming the directory that holds the journal.
pub const DATA_DIR_KEY: &str = "DISPENSARY_DATA_DIR";

pub const JOURNAL_FILE: &str = "journal.jsonl";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    Empty(&'static str),

    #[error("{key} points at {path}, which is not a directory")]
    NotADirectory { key: &'static str, path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispensaryConfig {
    /// Where the journal lives. `None` means keep everything in memory.
    pub data_dir: Option<PathBuf>,
}

impl DispensaryConfig {
    /// Build from any key lookup (environment, test map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = match lookup(DATA_DIR_KEY) {
            None => None,
            Some(raw) if raw.trim().is_empty() => return Err(ConfigError::Empty(DATA_DIR_KEY)),
            Some(raw) => {
                let path = PathBuf::from(raw.trim());
                if path.exists() && !path.is_dir() {
                    return Err(ConfigError::NotADirectory {
                        key: DATA_DIR_KEY,
                        path,
                    });
                }
                Some(path)
            }
        };

        Ok(Self { data_dir })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(JOURNAL_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_data_dir_means_in_memory() {
        let config = DispensaryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_dir, None);
        assert_eq!(config.journal_path(), None);
    }

    #[test]
    fn journal_lives_in_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().to_string_lossy().to_string();
        let config = DispensaryConfig::from_lookup(lookup(&[(DATA_DIR_KEY, &raw)])).unwrap();
        assert_eq!(config.journal_path(), Some(dir.path().join("journal.jsonl")));
    }

    #[test]
    fn missing_directory_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("not-yet").to_string_lossy().to_string();
        assert!(DispensaryConfig::from_lookup(lookup(&[(DATA_DIR_KEY, &raw)])).is_ok());
    }

    #[test]
    fn empty_value_is_rejected() {
        let err = DispensaryConfig::from_lookup(lookup(&[(DATA_DIR_KEY, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty(DATA_DIR_KEY));
    }

    #[test]
    fn file_instead_of_directory_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let raw = file.path().to_string_lossy().to_string();
        let err = DispensaryConfig::from_lookup(lookup(&[(DATA_DIR_KEY, &raw)])).unwrap_err();
        assert!(matches!(err, ConfigError::NotADirectory { .. }));
    }
}
