//! Environment-driven configuration
//!
//! All tunables and credentials come from the process environment, with an
//! optional `.env` file loaded once at startup. Collaborator modules read
//! their API keys through [`env_key`] so an unset or empty variable reads as
//! "feature disabled" rather than an error.

use std::env;
use std::path::PathBuf;

/// Load a `.env` file from the working directory, if present.
///
/// Real environment variables always take precedence over file entries.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Read a non-empty environment variable.
pub fn env_key(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

/// State directory for small persisted files (alert cooldown marker).
///
/// Uses the platform data-local dir, falling back to the working directory
/// when the platform reports none.
pub fn state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("argus")
}
