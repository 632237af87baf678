//! Process settings for the binary.
//!
//! The engine itself takes its configuration per call. These settings only
//! decide how the CLI and the HTTP shell wire it up.

use std::env;
use std::path::PathBuf;

use crate::export::DEFAULT_EXPORT_BASE_URL;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_WORKSPACE: &str = ".mailmerge/workspace.json";
pub const DEFAULT_ACCESS_TOKEN: &str = "local";

/// Settings read from `MAILMERGE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// HTTP port for `serve`
    pub port: u16,
    /// Workspace snapshot file
    pub workspace: PathBuf,
    /// Credential used by CLI commands
    pub access_token: String,
    /// Host serving `/document/d/<id>/export`
    pub export_base_url: String,
    /// Export through the remote endpoint instead of rendering locally
    pub remote_export: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            access_token: DEFAULT_ACCESS_TOKEN.to_string(),
            export_base_url: DEFAULT_EXPORT_BASE_URL.to_string(),
            remote_export: false,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup. Unparseable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup("MAILMERGE_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            workspace: lookup("MAILMERGE_WORKSPACE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace),
            access_token: lookup("MAILMERGE_ACCESS_TOKEN")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.access_token),
            export_base_url: lookup("MAILMERGE_EXPORT_BASE_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.export_base_url),
            remote_export: lookup("MAILMERGE_REMOTE_EXPORT")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.remote_export),
        }
    }
}
