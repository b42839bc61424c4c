//! TOML configuration loaded from the platform config directory.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Load the config file, or defaults when the file does not exist.
    pub fn load(&self) -> Result<AppConfig> {
        let path = self.config_path(CONFIG_FILE);
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub file_loading: FileLoadingConfig,
}

/// Settings for the completion service. Environment variables
/// (`ASKDATA_API_KEY`, `ASKDATA_MODEL`, `ASKDATA_BASE_URL`) override the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("ASKDATA_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn resolved_model(&self) -> String {
        std::env::var("ASKDATA_MODEL")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn resolved_base_url(&self) -> String {
        std::env::var("ASKDATA_BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoadingConfig {
    /// Field delimiter as a single character, e.g. ";".
    pub delimiter: Option<char>,
    /// Rows used for CSV schema inference.
    pub infer_schema_length: Option<usize>,
}
