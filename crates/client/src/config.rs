//! Client configuration.
//!
//! Reads/writes ~/.config/airsheet/config.json (0600 on Unix). Environment
//! variables override individual fields so CI can run without a file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AirScriptError, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.kdocs.cn";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "AIRSCRIPT_BASE_URL";
pub const ENV_FILE_ID: &str = "AIRSCRIPT_FILE_ID";
pub const ENV_SCRIPT_ID: &str = "AIRSCRIPT_SCRIPT_ID";
pub const ENV_TOKEN: &str = "AIRSCRIPT_TOKEN";

/// Everything needed to reach one script in one spreadsheet file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// File ID, from the spreadsheet URL
    pub file_id: String,
    /// Script ID inside that file
    pub script_id: String,
    /// AirScript token
    pub token: String,
    /// Site root, e.g. "https://www.kdocs.cn"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    pub fn new(file_id: impl Into<String>, script_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            script_id: script_id.into(),
            token: token.into(),
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Apply `AIRSCRIPT_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_BASE_URL) {
            self.base_url = v;
        }
        if let Some(v) = get(ENV_FILE_ID) {
            self.file_id = v;
        }
        if let Some(v) = get(ENV_SCRIPT_ID) {
            self.script_id = v;
        }
        if let Some(v) = get(ENV_TOKEN) {
            self.token = v;
        }
        self
    }

    /// Build a config purely from the environment.
    pub fn from_env() -> Result<Self> {
        let cfg = Self::new("", "", "").with_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fail with `NotConfigured` if an identifier or the token is missing,
    /// `InvalidArgument` on a zero timeout.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("file_id", &self.file_id),
            ("script_id", &self.script_id),
            ("token", &self.token),
            ("base_url", &self.base_url),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();

        if !missing.is_empty() {
            return Err(AirScriptError::NotConfigured(format!("missing {}", missing.join(", "))));
        }
        if self.timeout_secs == 0 {
            return Err(AirScriptError::InvalidArgument("timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Full `sync_task` URL for this file/script pair.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/api/v3/ide/file/{}/script/{}/sync_task",
            self.base_url.trim_end_matches('/'),
            self.file_id,
            self.script_id,
        )
    }
}

/// Returns the path to the config file.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("airsheet/config.json"))
}

/// Load the saved config.
/// Returns Ok(None) if nothing is saved; a file that exists but does not
/// parse is a `Config` error.
pub fn load_config() -> Result<Option<ClientConfig>> {
    match config_file_path() {
        Some(path) => load_config_if_exists(&path),
        None => Ok(None),
    }
}

pub fn load_config_if_exists(path: &Path) -> Result<Option<ClientConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    load_config_from(path).map(Some)
}

pub fn load_config_from(path: &Path) -> Result<ClientConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AirScriptError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| AirScriptError::Config(format!("invalid config in {}: {}", path.display(), e)))
}

/// Save the config to the default location.
pub fn save_config(config: &ClientConfig) -> Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| AirScriptError::Config("could not determine config directory".into()))?;
    save_config_to(&path, config)?;
    Ok(path)
}

/// Save the config to `path`, creating parent directories.
/// Sets 0600 permissions on Unix since the file holds the token.
pub fn save_config_to(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AirScriptError::Config(format!("failed to create config directory: {}", e)))?;
    }

    let contents = serde_json::to_string_pretty(config)
        .map_err(|e| AirScriptError::Config(format!("failed to serialize config: {}", e)))?;

    std::fs::write(path, &contents)
        .map_err(|e| AirScriptError::Config(format!("failed to write config file: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| AirScriptError::Config(format!("failed to set file permissions: {}", e)))?;
    }

    Ok(())
}

/// Delete the saved config. Missing file is fine.
pub fn delete_config() -> Result<()> {
    let Some(path) = config_file_path() else {
        return Ok(());
    };
    if path.exists() {
        std::fs::remove_file(&path)
            .map_err(|e| AirScriptError::Config(format!("failed to delete config file: {}", e)))?;
    }
    Ok(())
}
