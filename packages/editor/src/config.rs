use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_CONFIG_NAME: &str = "dadm.config.json";

/// Properties editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Quiet period after a blur before the field is committed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Extension property keys bound as fields on elements that support them
    #[serde(default = "default_extension_keys")]
    pub extension_keys: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_extension_keys() -> Vec<String> {
    vec![
        "service.name".to_string(),
        "service.type".to_string(),
        "service.version".to_string(),
    ]
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EditorConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(EditorConfig::default())
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            extension_keys: default_extension_keys(),
        }
    }
}
