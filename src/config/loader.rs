//! Config file loader and serialization.

use super::Configuration;
use crate::error::ConfigError;
use std::fs;
use std::path::Path;

/// Load config from a JSON metadata file, validating it on the way in.
pub fn load_config_from_file(path: &Path) -> Result<Configuration, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!("Configuration file not found at: {}", path.display()))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let mut config: Configuration = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;
    config.validate();
    Ok(config)
}

/// Save config to a JSON file (post-validation effective config).
pub fn save_config_to_file(config: &Configuration, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }
    }

    let json_content = serde_json::to_string_pretty(config).map_err(ConfigError::InvalidJson)?;
    fs::write(path, json_content).map_err(ConfigError::IoError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trips_unknown_keys() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("metadata.json");

        let mut general = Map::new();
        general.insert("window".to_string(), Value::from(30));
        general.insert("custom_future_key".to_string(), Value::from("kept"));
        let original = Configuration::load_from_dict(general, Map::new(), Map::new());

        save_config_to_file(&original, &config_path).expect("save failed");
        let loaded = load_config_from_file(&config_path).expect("load failed");

        assert_eq!(loaded.window(), 30);
        assert_eq!(
            loaded.general_config.get("custom_future_key").and_then(Value::as_str),
            Some("kept")
        );
    }

    #[test]
    fn load_nonexistent_file_fails() {
        let result = load_config_from_file(Path::new("/nonexistent/path/metadata.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn load_invalid_json_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.json");
        fs::write(&config_path, b"{ invalid json }").unwrap();

        let result = load_config_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::InvalidJson(_))));
    }
}
