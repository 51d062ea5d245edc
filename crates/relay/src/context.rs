use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{home_dir, Settings};
use crate::error::{RelayError, Result};

const DEFAULT_EXTRACTOR_JAR: &str = "f5.jar";
const DEFAULT_ARTIFACT_NAME: &str = "text.txt";
const DEFAULT_RUNTIME: &str = "java";
const DEFAULT_STEG_KEY: &str = "abcdefg123";
const DEFAULT_FAIL_BODY: &str = "-";
const DEFAULT_SUCCESS_BODY: &str = "+";

/// Mail settings for the optional confirmation step.
#[derive(Debug, Clone, PartialEq)]
pub struct MailSettings {
    pub server: String,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub confirm_address: String,
    /// Body sent when the relay output carries the rejection marker.
    pub fail_body: String,
    /// Body sent otherwise.
    pub success_body: String,
}

/// Everything one run needs, resolved once from [`Settings`].
///
/// No stage reads ambient process state: the working directory, tool
/// paths and tunables all travel through this value.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory scanned for carrier images; relative tool and artifact
    /// paths anchor here, and child processes run in it.
    pub work_dir: PathBuf,
    /// Relay daemon executable.
    pub daemon: PathBuf,
    /// Launcher for the extraction tool.
    pub runtime: PathBuf,
    /// Steganography tool jar.
    pub extractor_jar: PathBuf,
    /// Where the extraction tool writes the recovered message.
    pub artifact_path: PathBuf,
    /// Passphrase for the extraction tool.
    pub steg_key: String,
    pub debug: bool,
    /// Bounded wait for child processes; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// `None` skips the notification step entirely.
    pub mail: Option<MailSettings>,
}

impl RunContext {
    /// Resolve settings into a run context, applying documented
    /// defaults and validating every key the requested run path needs.
    ///
    /// Fails with [`RelayError::Config`] before any external process is
    /// invoked: `daemon` is always required, and the mail keys are
    /// required together once `confirm_address` is present.
    pub fn resolve(settings: &Settings) -> Result<Self> {
        let daemon = settings
            .daemon
            .as_deref()
            .ok_or_else(|| RelayError::Config("required setting 'daemon' is missing".to_string()))?;

        let work_dir = match &settings.sonicrelay {
            Some(dir) => PathBuf::from(dir),
            None => home_dir()?,
        };

        let extractor_jar = resolve_in(
            &work_dir,
            settings.f5.as_deref().unwrap_or(DEFAULT_EXTRACTOR_JAR),
        );
        let artifact_path = resolve_in(
            &work_dir,
            settings.text.as_deref().unwrap_or(DEFAULT_ARTIFACT_NAME),
        );

        Ok(Self {
            daemon: PathBuf::from(daemon),
            runtime: PathBuf::from(settings.java.as_deref().unwrap_or(DEFAULT_RUNTIME)),
            extractor_jar,
            artifact_path,
            steg_key: settings
                .steg_key
                .clone()
                .unwrap_or_else(|| DEFAULT_STEG_KEY.to_string()),
            debug: settings.is_debug(),
            timeout: settings.timeout.map(Duration::from_secs),
            mail: resolve_mail(settings)?,
            work_dir,
        })
    }
}

fn resolve_mail(settings: &Settings) -> Result<Option<MailSettings>> {
    let confirm_address = match &settings.confirm_address {
        Some(address) => address.clone(),
        None => return Ok(None),
    };

    let require = |key: &str, value: &Option<String>| -> Result<String> {
        value.clone().ok_or_else(|| {
            RelayError::Config(format!(
                "setting '{key}' is required when 'confirm_address' is set"
            ))
        })
    };

    Ok(Some(MailSettings {
        sender: require("sender", &settings.sender)?,
        server: require("server", &settings.server)?,
        username: require("username", &settings.username)?,
        password: require("password", &settings.password)?,
        confirm_address,
        fail_body: settings
            .fail
            .clone()
            .unwrap_or_else(|| DEFAULT_FAIL_BODY.to_string()),
        success_body: settings
            .success
            .clone()
            .unwrap_or_else(|| DEFAULT_SUCCESS_BODY.to_string()),
    }))
}

/// Anchor a relative path under the working directory; absolute paths
/// pass through untouched.
fn resolve_in(work_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        work_dir.join(path)
    }
}
