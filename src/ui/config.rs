use serde::{Deserialize, Serialize};

use crate::OvercutError;
use log::warn;

const CONFIG_FILE_NAME: &str = "config.json";

/// Selections remembered between runs. Saved on exit, restored at startup
/// when the values still exist in the freshly loaded lists.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct AppConfig {
    pub last_circuit: Option<String>,
    pub last_driver_a: Option<String>,
    pub last_driver_b: Option<String>,
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("overcut").join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return None;
        }

        let file = match std::fs::File::open(&config_path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not open config file {:?}: {}", config_path, e);
                return None;
            }
        };
        match serde_json::from_reader(file) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Could not parse config file {:?}: {}", config_path, e);
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), OvercutError> {
        let config_dir = dirs::config_dir()
            .ok_or(OvercutError::NoConfigDir)?
            .join("overcut");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)
                .map_err(|e| OvercutError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_dir.join(CONFIG_FILE_NAME))
            .map_err(|e| OvercutError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| OvercutError::ConfigSerializeError { source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parses_to_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.last_circuit, None);
        assert_eq!(config.last_driver_a, None);
        assert_eq!(config.last_driver_b, None);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"last_circuit": "Bahrain Grand Prix"}"#).unwrap();
        assert_eq!(config.last_circuit.as_deref(), Some("Bahrain Grand Prix"));
        assert_eq!(config.last_driver_a, None);
    }
}
