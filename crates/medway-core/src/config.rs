use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MedwayError, Result};

/// Top-level configuration for the Medway application.
///
/// Loaded from `~/.medway/config.toml` by default. Each section corresponds
/// to a subsystem of the conversation core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedwayConfig {
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

impl MedwayConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MedwayConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MedwayError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum number of recent text turns fed to the contextual-chat call.
    pub context_turns: usize,
    /// Maximum user message length in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_turns: 12,
            max_message_length: 2000,
        }
    }
}

/// Location acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Device-position timeout in seconds.
    pub position_timeout_secs: u64,
    /// City-level scope used by the directory flow when no location is known.
    pub default_city: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            position_timeout_secs: 10,
            default_city: "Lima".to_string(),
        }
    }
}

/// Nearby-facility search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum results kept from one search.
    pub max_results: usize,
    /// Fixed category phrase used for pharmacy searches.
    pub pharmacy_category: String,
    /// Generic phrase used for triage searches without an analyzed specialty.
    pub generic_facility: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            pharmacy_category: "farmacias y boticas".to_string(),
            generic_facility: "centros de salud".to_string(),
        }
    }
}

/// Uploaded-document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Interval between processing-status polls in seconds.
    pub poll_interval_secs: u64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
