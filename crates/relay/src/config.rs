use directories::UserDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};

/// Raw settings as read from the flat key-value settings file.
///
/// Every recognized key is optional here; defaulting, path resolution
/// and required-key validation happen when the
/// [`RunContext`](crate::context::RunContext) is resolved. Unknown keys
/// in the file are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the relay daemon executable.
    pub daemon: Option<String>,
    /// Path to the steganography tool jar.
    pub f5: Option<String>,
    /// Filename of the extracted-message artifact.
    pub text: Option<String>,
    /// Launcher for the extraction tool.
    pub java: Option<String>,
    /// Passphrase handed to the extraction tool.
    pub steg_key: Option<String>,
    /// Enables the diagnostic surface.
    pub debug: Option<bool>,
    /// Working directory override.
    pub sonicrelay: Option<String>,
    /// Bounded wait for child processes, in seconds.
    pub timeout: Option<u64>,
    // Mail settings, required together when `confirm_address` is set
    pub sender: Option<String>,
    pub confirm_address: Option<String>,
    pub server: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Mail body on a rejected relay.
    pub fail: Option<String>,
    /// Mail body on a successful relay.
    pub success: Option<String>,
}

impl Settings {
    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }
}

/// Read the settings file at `path`.
///
/// A missing file is [`RelayError::ConfigNotFound`]; this is checked
/// before anything else so a misconfigured run has no side effects.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(RelayError::ConfigNotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| RelayError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    toml::from_str::<Settings>(&contents)
        .map_err(|e| RelayError::Config(format!("failed to parse {}: {}", path.display(), e)))
}

/// Default settings location: `.sonicrelay` in the user's home directory.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(".sonicrelay"))
}

pub(crate) fn home_dir() -> Result<PathBuf> {
    UserDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| RelayError::Config("unable to determine home directory".to_string()))
}
