//! Application configuration loading from config.toml
//!
//! The file supplies the settings a new identity starts with (before it has
//! saved any), how amounts are displayed, and where sign-up confirmation
//! emails link back to. Every section is optional.

use crate::{
    entities::Settings,
    errors::{Error, Result},
};
use serde::Deserialize;
use std::{env::VarError, path::Path};
use tracing::{debug, error, info};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_VAR: &str = "FLEETDESK_CONFIG";
/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Settings used until the identity saves its own
    pub settings: SettingsDefaults,
    /// Display options for rendered views
    pub display: DisplayConfig,
    /// Auth options
    pub auth: AuthConfig,
}

/// Default values for [`Settings`]; unset fields use the built-in defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsDefaults {
    /// Opening balance
    pub starting_balance: Option<f64>,
    /// Transaction categories
    pub categories: Option<Vec<String>>,
    /// Transaction subcategories
    pub subcategories: Option<Vec<String>>,
}

impl SettingsDefaults {
    /// Resolves to concrete settings.
    #[must_use]
    pub fn to_settings(&self) -> Settings {
        let builtin = Settings::default();
        Settings {
            starting_balance: self.starting_balance.unwrap_or(builtin.starting_balance),
            categories: self.categories.clone().unwrap_or(builtin.categories),
            subcategories: self.subcategories.clone().unwrap_or(builtin.subcategories),
        }
    }
}

/// How numbers and units appear in rendered views
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Currency symbol appended to rates
    pub currency: String,
    /// Unit appended to mileage
    pub distance_unit: String,
    /// Separator between digit groups, e.g. `" "` for `12 345`
    pub thousands_separator: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: "₽".to_string(),
            distance_unit: "km".to_string(),
            thousands_separator: " ".to_string(),
        }
    }
}

/// Auth options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// URL confirmation emails link back to
    pub redirect_url: Option<String>,
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    let config = toml::from_str(&contents)
        .inspect_err(|e| error!("Invalid TOML in config file {:?}: {}", path_ref, e))?;
    Ok(config)
}

/// Picks the config file path from the `FLEETDESK_CONFIG` lookup result.
///
/// An unset variable means the default path; a value that is not valid
/// Unicode is an error rather than a silent fallback.
fn config_path(lookup: std::result::Result<String, VarError>) -> Result<String> {
    match lookup {
        Ok(path) => Ok(path),
        Err(VarError::NotPresent) => Ok(DEFAULT_CONFIG_PATH.to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Loads the configuration from `FLEETDESK_CONFIG` or `./config.toml`.
///
/// A missing file is not an error: the built-in defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = config_path(std::env::var(CONFIG_PATH_VAR))?;
    if !Path::new(&path).exists() {
        info!("No config file at {}, using built-in defaults", path);
        return Ok(AppConfig::default());
    }
    load_config(&path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [settings]
            starting_balance = 25000.0
            categories = ["Rent", "Fuel"]

            [display]
            currency = "€"
            distance_unit = "mi"
            thousands_separator = ","

            [auth]
            redirect_url = "https://fleet.example.com"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let settings = config.settings.to_settings();
        assert_eq!(settings.starting_balance, 25000.0);
        assert_eq!(settings.categories, vec!["Rent", "Fuel"]);
        assert_eq!(settings.subcategories, Settings::default().subcategories);
        assert_eq!(config.display.currency, "€");
        assert_eq!(config.display.thousands_separator, ",");
        assert_eq!(
            config.auth.redirect_url.as_deref(),
            Some("https://fleet.example.com")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.settings.to_settings(), Settings::default());
        assert_eq!(config.display.distance_unit, "km");
        assert!(config.auth.redirect_url.is_none());
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let result = load_config("/definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_reads_file_and_rejects_bad_toml() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("config.toml");
        std::fs::write(&good, "[display]\ncurrency = \"$\"\n").unwrap();
        assert_eq!(load_config(&good).unwrap().display.currency, "$");

        let bad = dir.path().join("broken.toml");
        std::fs::write(&bad, "[display\ncurrency = ").unwrap();
        assert!(matches!(
            load_config(&bad),
            Err(Error::Config { message }) if message.starts_with("Failed to parse TOML")
        ));
    }

    #[test]
    fn test_config_path_lookup() {
        assert_eq!(
            config_path(Ok("/etc/fleetdesk.toml".to_string())).unwrap(),
            "/etc/fleetdesk.toml"
        );
        assert_eq!(config_path(Err(VarError::NotPresent)).unwrap(), DEFAULT_CONFIG_PATH);

        let garbled = VarError::NotUnicode(std::ffi::OsString::from("config"));
        assert!(matches!(config_path(Err(garbled)), Err(Error::EnvVar(_))));
    }
}
