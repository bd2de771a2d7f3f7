//! Engine configuration, read from `.apexflow/config.json`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".apexflow";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Discovery of one method stops after this many control-flow paths.
    pub max_paths_per_method: usize,

    /// Workers read through a just-in-time subgraph instead of the full graph.
    pub just_in_time: bool,

    /// Parallel walks in the CLI.
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_paths_per_method: 512,
            just_in_time: true,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl EngineConfig {
    /// Path of the config file under a project root.
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Loads the config under `root`, falling back to defaults when the file
    /// does not exist.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the config under `root`, creating the directory.
    pub fn save(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let path = Self::path_in(root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_paths_per_method, 512);
        assert!(config.just_in_time);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let config = EngineConfig {
            max_paths_per_method: 8,
            just_in_time: false,
            worker_threads: 2,
        };
        let written = config.save(dir.path()).unwrap();
        assert!(written.ends_with(".apexflow/config.json"));
        assert_eq!(EngineConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = EngineConfig::path_in(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"just_in_time": false}"#).unwrap();
        let config = EngineConfig::load(dir.path()).unwrap();
        assert!(!config.just_in_time);
        assert_eq!(config.max_paths_per_method, 512);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = EngineConfig::path_in(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            EngineConfig::load(dir.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
