//! Unified error types and result handling.
//!
//! Errors fall into three groups: local validation failures that never reach the
//! network, errors reported by the remote backend, and infrastructure failures
//! (HTTP transport, (de)serialization, templates, configuration).

use thiserror::Error;

/// PostgREST code for "single row requested, zero rows returned".
pub const NO_ROWS_CODE: &str = "PGRST116";

/// GoTrue code returned when signing up with an email that is already registered.
pub const USER_ALREADY_EXISTS_CODE: &str = "user_already_exists";

/// Application error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Local input validation failed; no network call was made
    #[error("{message}")]
    Validation {
        /// Form field the error belongs to
        field: &'static str,
        /// User-facing explanation
        message: String,
    },

    /// An operation that needs a signed-in identity was called without one
    #[error("User is not signed in")]
    NotAuthenticated,

    /// The remote backend rejected the request
    #[error("Backend error ({}): {message}", .code.as_deref().unwrap_or("unknown"))]
    Backend {
        /// HTTP status, when the error came over HTTP
        status: Option<u16>,
        /// Backend error code (e.g. `PGRST116`, `invalid_credentials`)
        code: Option<String>,
        /// Server-provided message, possibly empty
        message: String,
    },

    /// Sign-up was answered with the "account already exists" signal
    #[error("A user with email {email} already exists")]
    AccountExists {
        /// The email that was submitted
        email: String,
    },

    /// A row returned by the backend does not have the expected shape
    #[error("Malformed {table} row: {message}")]
    MalformedRow {
        /// Table the row came from
        table: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A shell line did not parse, or asked for help; carries clap's rendering
    #[error(transparent)]
    Usage(#[from] clap::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Builds a validation error for `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Builds a backend error without an HTTP status.
    pub fn backend(code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Backend {
            status: None,
            code: code.map(str::to_owned),
            message: message.into(),
        }
    }

    /// Returns the backend error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// True when the backend reported "no rows" for a single-row query.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(NO_ROWS_CODE)
    }

    /// Text suitable for showing to the user.
    ///
    /// Backend errors carry the server's message; when that is empty `fallback`
    /// is used instead.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Backend { message, .. } if message.trim().is_empty() => fallback.to_string(),
            Self::Backend { message, .. } => message.clone(),
            Self::Validation { message, .. } => message.clone(),
            Self::AccountExists { .. } => "A user with this email already exists".to_string(),
            Self::Http(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Self::Config {
            message: format!("Failed to parse TOML: {value}"),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
