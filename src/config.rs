//! Settings loaded from the config file and environment.
//!
//! Precedence (highest first):
//! 1. `GITMESSAGE_API_KEY`, then `MISTRAL_API_KEY` for the credential;
//!    `GITMESSAGE_TIMEOUT` for the timeout
//! 2. `config.toml` in the gitmessage config directory (or `GITMESSAGE_CONFIG`)
//! 3. Built-in defaults

use std::env;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use toml_edit::DocumentMut;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::llm::{DEFAULT_AGENT_ID, DEFAULT_ENDPOINT};

/// Environment variable holding the API key.
pub const API_KEY_ENV_VAR: &str = "GITMESSAGE_API_KEY";

/// Fallback environment variable holding the API key.
pub const MISTRAL_KEY_ENV_VAR: &str = "MISTRAL_API_KEY";

/// Environment variable to override the request timeout, in seconds.
pub const TIMEOUT_ENV_VAR: &str = "GITMESSAGE_TIMEOUT";

/// Environment variable to override the config file location.
pub const CONFIG_PATH_ENV_VAR: &str = "GITMESSAGE_CONFIG";

/// Default timeout for git queries and the completion request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Source of the API credential.
pub trait ConfigSource: Send + Sync {
    fn credential(&self) -> Option<String>;
}

/// Effective settings for one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub agent_id: String,
    pub timeout: Duration,
    api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            agent_id: DEFAULT_AGENT_ID.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_key: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("agent_id", &self.agent_id)
            .field("timeout", &self.timeout)
            .field("api_key", &self.masked_api_key())
            .finish()
    }
}

impl ConfigSource for Settings {
    fn credential(&self) -> Option<String> {
        self.api_key.clone()
    }
}

impl Settings {
    /// Load settings from the default config file location and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Ok(path) => Self::load_from(&path),
            Err(ConfigError::NoConfigDir) => {
                warn!("No config directory available, using environment only");
                Ok(Self::default().with_env_overrides())
            }
            Err(e) => Err(e),
        }
    }

    /// Load settings from `path` (missing file is fine) and the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(doc) = read_document(path)? {
            debug!("Loaded config from {}", path.display());

            if let Some(key) = doc.get("api_key").and_then(|v| v.as_str()) {
                settings.api_key = non_blank(key);
            }
            if let Some(endpoint) = doc.get("endpoint").and_then(|v| v.as_str()) {
                settings.endpoint = endpoint.to_string();
            }
            if let Some(agent_id) = doc.get("agent_id").and_then(|v| v.as_str()) {
                settings.agent_id = agent_id.to_string();
            }
            match doc.get("timeout_secs").map(|v| v.as_integer()) {
                Some(Some(secs)) if secs > 0 => {
                    settings.timeout = Duration::from_secs(secs.unsigned_abs());
                }
                Some(_) => warn!(
                    "Invalid timeout_secs in {}, using default {}s",
                    path.display(),
                    DEFAULT_TIMEOUT_SECS
                ),
                None => {}
            }
        }

        Ok(settings.with_env_overrides())
    }

    /// Apply environment overrides on top of file/default values.
    fn with_env_overrides(mut self) -> Self {
        if let Some(key) = env_value(API_KEY_ENV_VAR).or_else(|| env_value(MISTRAL_KEY_ENV_VAR)) {
            self.api_key = Some(key);
        }
        if let Some(timeout) = timeout_from_env() {
            self.timeout = timeout;
        }
        self
    }

    /// Replace the credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = non_blank(&key.into());
        self
    }

    /// The credential with all but its last four characters hidden.
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 4 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{tail}")
            }
        })
    }
}

/// Location of the config file.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env_value(CONFIG_PATH_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("gitmessage").join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

/// The config file location for display, `(none)` without a config directory.
pub fn config_path_label() -> String {
    path_label(config_path().ok().as_deref())
}

fn path_label(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

/// Store `key` as the `api_key` in the config file at `path`.
///
/// Other keys, comments and formatting in the file are preserved. The file
/// is replaced atomically.
pub fn save_api_key(path: &Path, key: &str) -> Result<(), ConfigError> {
    let mut doc = read_document(path)?.unwrap_or_default();
    doc["api_key"] = toml_edit::value(key.trim());

    let write_failed = |source| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(doc.to_string().as_bytes())
        .map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    debug!("Saved API key to {}", path.display());
    Ok(())
}

/// Read and parse the config file, `None` if it does not exist.
fn read_document(path: &Path) -> Result<Option<DocumentMut>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    content
        .parse::<DocumentMut>()
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Read the timeout override.
///
/// Logs a warning if the environment variable is set but contains
/// an invalid value (non-numeric, zero, or negative).
fn timeout_from_env() -> Option<Duration> {
    let value = env_value(TIMEOUT_ENV_VAR)?;
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warn!(
                "Invalid {} value '{}', using configured timeout",
                TIMEOUT_ENV_VAR, value
            );
            None
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|v| non_blank(&v))
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
