use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{feed::kma::DEFAULT_BASE_URL, grid::Coordinate};

/// Environment variable that overrides the stored service key.
pub const SERVICE_KEY_ENV: &str = "KMA_API_KEY";

/// A named location used when no coordinate is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SavedLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Public data portal service key, as issued (already percent-encoded).
    pub service_key: Option<String>,

    /// Override for the feed root, e.g. a local proxy.
    pub base_url: Option<String>,

    /// Example TOML:
    /// [default_location]
    /// name = "Seoul"
    /// latitude = 37.5665
    /// longitude = 126.978
    pub default_location: Option<SavedLocation>,
}

impl Config {
    /// Service key from the environment, else from the config file.
    pub fn service_key(&self) -> Option<String> {
        self.resolve_service_key(std::env::var(SERVICE_KEY_ENV).ok())
    }

    fn resolve_service_key(&self, from_env: Option<String>) -> Option<String> {
        from_env
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.service_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_service_key(&mut self, key: String) {
        self.service_key = Some(key);
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn set_default_location(&mut self, location: SavedLocation) {
        self.default_location = Some(location);
    }

    /// The default location, or an error explaining how to set one.
    pub fn default_location(&self) -> Result<&SavedLocation> {
        self.default_location.as_ref().ok_or_else(|| {
            anyhow!(
                "No default location configured.\n\
                 Hint: pass --lat and --lon, or run `kma configure` first."
            )
        })
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "kma-weather", "kma-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
