//! Configuration management with layered hierarchy
//!
//! Sources, lowest priority first: built-in defaults, the global config file
//! (`<config dir>/hospital/config.yaml`), environment variables, then CLI
//! flags applied by the caller.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DB_FILE_NAME: &str = "hospital.db";

/// Hospital records configuration
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file (default: `hospital.db` in the user data directory)
    pub database: Option<PathBuf>,

    /// Directory holding the CSV sources; embedded sample data when unset
    pub data_dir: Option<PathBuf>,

    /// Seed for the classification pass; random when unset
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/hospital/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Environment variables
        config.merge(Self::from_env(|key| std::env::var(key).ok()));

        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hospital")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring invalid config file: {}", e);
                None
            }
        }
    }

    /// Read `HOSPITAL_DB_PATH`, `HOSPITAL_DATA_DIR` and `HOSPITAL_SEED`
    /// through `lookup`
    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Config {
        let seed = lookup("HOSPITAL_SEED").and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                tracing::warn!(value = %raw, "ignoring non-numeric HOSPITAL_SEED");
                None
            }
        });

        Config {
            database: lookup("HOSPITAL_DB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            data_dir: lookup("HOSPITAL_DATA_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            seed,
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.seed.is_some() {
            self.seed = other.seed;
        }
    }

    /// Resolved database file path
    pub fn database_path(&self) -> PathBuf {
        if let Some(ref path) = self.database {
            return path.clone();
        }

        directories::ProjectDirs::from("", "", "hospital")
            .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            database: Some(PathBuf::from("a.db")),
            data_dir: Some(PathBuf::from("data")),
            seed: None,
        };
        base.merge(Config {
            database: Some(PathBuf::from("b.db")),
            data_dir: None,
            seed: Some(7),
        });

        assert_eq!(base.database, Some(PathBuf::from("b.db")));
        assert_eq!(base.data_dir, Some(PathBuf::from("data")));
        assert_eq!(base.seed, Some(7));
    }

    #[test]
    fn test_from_env() {
        let config = Config::from_env(env(&[
            ("HOSPITAL_DB_PATH", "/tmp/h.db"),
            ("HOSPITAL_SEED", "42"),
        ]));

        assert_eq!(config.database, Some(PathBuf::from("/tmp/h.db")));
        assert_eq!(config.data_dir, None);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_bad_seed_is_ignored() {
        let config = Config::from_env(env(&[("HOSPITAL_SEED", "many")]));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "database: /var/lib/hospital.db\nseed: 3\n").unwrap();

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.database, Some(PathBuf::from("/var/lib/hospital.db")));
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_invalid_yaml_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "seed: [not, a, number]\n").unwrap();

        assert_eq!(Config::read_file(&path), None);
    }

    #[test]
    fn test_database_path_uses_explicit_value() {
        let config = Config {
            database: Some(PathBuf::from("here.db")),
            ..Default::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("here.db"));
        assert!(Config::default().database_path().ends_with(DB_FILE_NAME));
    }
}
