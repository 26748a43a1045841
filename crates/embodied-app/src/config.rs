//! Configuration management for embodied-carbon
//!
//! Config stored at: ~/.config/embodied-carbon/config.json

use std::path::{Path, PathBuf};

use embodied_types::{ConfigError, OutputFormat, Result};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "embodied-carbon";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Material intensity source table
    #[serde(default = "default_intensity_csv")]
    pub intensity_csv: PathBuf,

    /// Carbon factor source table
    #[serde(default = "default_factor_csv")]
    pub carbon_factor_csv: PathBuf,

    /// Project store directory override
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// Persist projects to disk; when false edits live only in memory
    #[serde(default = "default_true")]
    pub persistence_enabled: bool,

    /// Default output format (json, table)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

fn default_intensity_csv() -> PathBuf {
    PathBuf::from("data").join("material-intensity.csv")
}

fn default_factor_csv() -> PathBuf {
    PathBuf::from("data").join("embodied carbon.csv")
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intensity_csv: default_intensity_csv(),
            carbon_factor_csv: default_factor_csv(),
            store_dir: None,
            persistence_enabled: true,
            output_format: default_output_format(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join(APP_DIR);
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the project store directory
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }

        let store_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join(APP_DIR);
        Ok(store_dir)
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Embodied Carbon Configuration")?;
        writeln!(f, "=============================")?;
        writeln!(f)?;
        writeln!(f, "Intensity CSV:  {}", self.intensity_csv.display())?;
        writeln!(f, "Factor CSV:     {}", self.carbon_factor_csv.display())?;
        writeln!(
            f,
            "Store dir:      {}",
            self.store_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Persistence:    {}", self.persistence_enabled)?;
        writeln!(f, "Output format:  {}", self.output_format)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:    {}", path.display())?;
        }

        Ok(())
    }
}
