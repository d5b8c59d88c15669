//! Configuration for the encdb bootstrap.
//!
//! The host supplies one immutable [`EncDbConfig`] for the process lifetime,
//! either built directly or bound from `ENCDB_*` environment variables via
//! [`EncDbConfig::from_env`]. Unset algorithm, driver and path values always
//! resolve to non-empty defaults.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{EncDbError, Result};

/// Default location of the key artifact consumed by the encryption driver.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/encdb/config/encjdbc.conf";

/// Default encryption algorithm identifier written to the artifact.
pub const DEFAULT_ENC_ALGO: &str = "SM4_128_CBC";

/// Default encryption-aware driver class applied to patched pools.
pub const DEFAULT_DRIVER_CLASS: &str = "com.aliyun.encdb.mysql.jdbc.EncDriver";

/// Pool property key the encryption driver reads to locate the key artifact.
pub const CONFIG_FILE_PROPERTY: &str = "encJdbcConfigFile";

/// Bootstrap configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct EncDbConfig {
    /// Master switch; everything is a no-op when false.
    pub enabled: bool,
    /// Force regeneration of the key artifact even if it exists.
    pub reset: bool,
    /// Explicit master key; when set, random generation is skipped.
    pub mek: Option<SecretString>,
    /// Encryption algorithm identifier (empty falls back to the default).
    pub enc_algo: String,
    /// Driver class name applied to patched pools.
    pub driver_class_name: String,
    /// Filesystem path of the key artifact.
    pub config_path: String,
    /// Log each patched value before/after at info level.
    pub show_log: bool,
}

impl Default for EncDbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            reset: false,
            mek: None,
            enc_algo: DEFAULT_ENC_ALGO.to_string(),
            driver_class_name: DEFAULT_DRIVER_CLASS.to_string(),
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            show_log: false,
        }
    }
}

impl EncDbConfig {
    /// Load configuration from `ENCDB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Ok(Self {
            enabled: optional_bool("ENCDB_ENABLED")?.unwrap_or(false),
            reset: optional_bool("ENCDB_RESET")?.unwrap_or(false),
            mek: optional_env("ENCDB_MEK")
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            enc_algo: optional_env("ENCDB_ENC_ALGO").unwrap_or(defaults.enc_algo),
            driver_class_name: optional_env("ENCDB_DRIVER_CLASS_NAME")
                .unwrap_or(defaults.driver_class_name),
            config_path: optional_env("ENCDB_CONFIG_PATH").unwrap_or(defaults.config_path),
            show_log: optional_bool("ENCDB_SHOW_LOG")?.unwrap_or(false),
        })
    }

    /// Artifact path, falling back to [`DEFAULT_CONFIG_PATH`] when unset.
    pub fn resolved_config_path(&self) -> PathBuf {
        if self.config_path.trim().is_empty() {
            PathBuf::from(DEFAULT_CONFIG_PATH)
        } else {
            PathBuf::from(&self.config_path)
        }
    }

    /// Algorithm identifier, falling back to [`DEFAULT_ENC_ALGO`] when unset.
    pub fn resolved_enc_algo(&self) -> &str {
        if self.enc_algo.trim().is_empty() {
            DEFAULT_ENC_ALGO
        } else {
            &self.enc_algo
        }
    }

    /// Driver class name, falling back to [`DEFAULT_DRIVER_CLASS`] when unset.
    pub fn resolved_driver_class(&self) -> &str {
        if self.driver_class_name.trim().is_empty() {
            DEFAULT_DRIVER_CLASS
        } else {
            &self.driver_class_name
        }
    }

    /// The explicit master key, if one was configured and is non-empty.
    pub fn explicit_mek(&self) -> Option<&str> {
        self.mek
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn optional_bool(key: &str) -> Result<Option<bool>> {
    match optional_env(key) {
        None => Ok(None),
        Some(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or_else(|| EncDbError::Config(format!("{} must be a boolean, got {:?}", key, raw))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
