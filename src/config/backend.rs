//! Remote backend configuration.
//!
//! The project URL and the public anon key come from the environment (usually
//! via `.env`). The key is held as a [`SecretString`] so it never shows up in
//! debug output.

use crate::errors::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Environment variable holding the project URL
pub const URL_VAR: &str = "SUPABASE_URL";
/// Environment variable holding the anon key
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
/// Environment variable naming the file the session is persisted to
pub const SESSION_FILE_VAR: &str = "FLEETDESK_SESSION_FILE";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    pub url: String,
    /// Public anon key sent as `apikey`
    pub anon_key: SecretString,
    /// Where the session is stored between runs; `None` keeps it in memory only
    pub session_file: Option<PathBuf>,
}

impl BackendConfig {
    /// Reads the backend settings from the environment.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the URL or the anon key is missing or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::Config {
                    message: format!("{name} must be set"),
                })
        };

        let url = required(URL_VAR)?;
        let anon_key = SecretString::from(required(ANON_KEY_VAR)?);
        let session_file = lookup(SESSION_FILE_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            url,
            anon_key,
            session_file,
        })
    }
}
