use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Storage zone profile with credentials and region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Storage zone name
    pub storage_zone: String,

    /// API access key for the zone
    pub access_key: String,

    /// Storage region code (default: de)
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "de".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Named profiles for different storage zones
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Profile used when none is specified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            default_profile: None,
        }
    }

    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else {
            self.profiles.values().next()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

/// Load configuration from environment variables
///
/// - BUNNY_STORAGE_ZONE (required)
/// - BUNNY_STORAGE_API_KEY (required)
/// - BUNNY_STORAGE_REGION (optional, defaults to de)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let mut config = Config::new();

    let storage_zone = std::env::var("BUNNY_STORAGE_ZONE")
        .context("BUNNY_STORAGE_ZONE environment variable not set")?;

    let access_key = std::env::var("BUNNY_STORAGE_API_KEY")
        .context("BUNNY_STORAGE_API_KEY environment variable not set")?;

    let region = std::env::var("BUNNY_STORAGE_REGION").unwrap_or_else(|_| "de".to_string());

    let profile = Profile {
        storage_zone,
        access_key,
        region,
    };

    config.profiles.insert("default".to_string(), profile);
    config.default_profile = Some("default".to_string());

    Ok(config)
}

/// Load configuration from file or environment
///
/// Tries the YAML file when a path is given, otherwise falls back to
/// environment variables.
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        // If a specific profile is requested, make it the default
        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        load_from_env()
    }
}
