//! Master-key generation and artifact provisioning.
//!
//! The artifact is a two-line `KEY=value` file the encryption driver reads at
//! connection time:
//!
//! ```text
//! MEK=<32-char hex key>
//! ENC_ALGO=SM4_128_CBC
//! ```
//!
//! Provisioning is idempotent: once written, the file is never touched again
//! unless `reset` is set.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::EncDbConfig;
use crate::error::{EncDbError, Result};

/// Master key entropy in bytes (128 bits, hex-encoded to 32 characters)
pub const MEK_BYTES: usize = 16;

/// A master encryption key that zeroizes memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    hex: String,
}

impl MasterKey {
    /// Generate a fresh key from the OS CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; MEK_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let hex = hex::encode(bytes);
        bytes.zeroize();
        Self { hex }
    }

    /// Wrap an explicitly configured key string
    pub fn from_literal(key: impl Into<String>) -> Self {
        Self { hex: key.into() }
    }

    /// Get the key string (use with caution)
    pub fn as_str(&self) -> &str {
        &self.hex
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey([REDACTED])")
    }
}

/// What provisioning did to the artifact on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SecretOutcome {
    /// Subsystem disabled; nothing was touched
    Disabled,
    /// Artifact already present and reset not requested
    Kept { path: PathBuf },
    /// Artifact freshly written (first run or reset)
    Written { path: PathBuf },
}

/// Generate and persist the key artifact, idempotently.
///
/// Returns [`SecretOutcome::Kept`] without touching the file when it already
/// exists and `reset` is false. Directory or write failures surface as
/// [`EncDbError::Io`]; callers log and continue, they never abort startup.
pub fn provision(config: &EncDbConfig) -> Result<SecretOutcome> {
    if !config.enabled {
        return Ok(SecretOutcome::Disabled);
    }

    let path = config.resolved_config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            EncDbError::Io(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    if path.exists() && !config.reset {
        tracing::debug!(path = %path.display(), "key artifact already present, keeping");
        return Ok(SecretOutcome::Kept { path });
    }

    let key = match config.explicit_mek() {
        Some(explicit) => MasterKey::from_literal(explicit),
        None => MasterKey::generate(),
    };
    let algo = config.resolved_enc_algo();

    write_artifact(&path, &key, algo)?;
    if config.show_log {
        tracing::info!(path = %path.display(), algo, "key artifact written");
    } else {
        tracing::debug!(path = %path.display(), algo, "key artifact written");
    }
    Ok(SecretOutcome::Written { path })
}

fn write_artifact(path: &Path, key: &MasterKey, algo: &str) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| EncDbError::Io(format!("Failed to create {}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "MEK={}", key.as_str())?;
    writeln!(writer, "ENC_ALGO={}", algo)?;
    writer.flush()?;

    // The artifact holds raw key material; keep it owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| EncDbError::Io(format!("Failed to chmod {}: {}", path.display(), e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use tempfile::tempdir;

    fn config_at(path: &Path) -> EncDbConfig {
        EncDbConfig {
            enabled: true,
            config_path: path.to_string_lossy().into_owned(),
            ..EncDbConfig::default()
        }
    }

    fn read_mek(path: &Path) -> String {
        let content = fs::read_to_string(path).unwrap();
        content
            .lines()
            .find_map(|line| line.strip_prefix("MEK="))
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_generated_key_is_32_hex_chars() {
        let key = MasterKey::generate();
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(MasterKey::generate().as_str(), MasterKey::generate().as_str());
    }

    #[test]
    fn test_master_key_debug_is_redacted() {
        let key = MasterKey::from_literal("deadbeef");
        assert_eq!(format!("{:?}", key), "MasterKey([REDACTED])");
    }

    #[test]
    fn test_disabled_is_a_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("encjdbc.conf");
        let config = EncDbConfig {
            enabled: false,
            ..config_at(&path)
        };

        assert_eq!(provision(&config).unwrap(), SecretOutcome::Disabled);
        assert!(!path.exists());
    }

    #[test]
    fn test_writes_artifact_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("encjdbc.conf");
        let config = config_at(&path);

        let outcome = provision(&config).unwrap();
        assert_eq!(outcome, SecretOutcome::Written { path: path.clone() });

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        let mek_line = lines.next().unwrap();
        assert_eq!(lines.next().unwrap(), "ENC_ALGO=SM4_128_CBC");
        assert!(content.ends_with('\n'));

        let mek = mek_line.strip_prefix("MEK=").unwrap();
        assert_eq!(mek.len(), 32);
        assert!(mek.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_provisioning_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("encjdbc.conf");
        let config = config_at(&path);

        provision(&config).unwrap();
        let first = fs::read(&path).unwrap();

        assert_eq!(provision(&config).unwrap(), SecretOutcome::Kept { path: path.clone() });
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_reset_generates_a_new_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("encjdbc.conf");
        let config = config_at(&path);

        provision(&config).unwrap();
        let first_key = read_mek(&path);

        let reset_config = EncDbConfig {
            reset: true,
            ..config_at(&path)
        };
        let outcome = provision(&reset_config).unwrap();
        assert_eq!(outcome, SecretOutcome::Written { path: path.clone() });
        assert_ne!(read_mek(&path), first_key);
    }

    #[test]
    fn test_explicit_mek_wins_regardless_of_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("encjdbc.conf");

        for reset in [false, true] {
            let config = EncDbConfig {
                reset,
                mek: Some(SecretString::from("abc123".to_string())),
                ..config_at(&path)
            };
            provision(&config).unwrap();
            assert_eq!(read_mek(&path), "abc123");
            fs::remove_file(&path).unwrap();
        }
    }

    #[test]
    fn test_algo_override_is_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("encjdbc.conf");
        let config = EncDbConfig {
            enc_algo: "AES_128_GCM".to_string(),
            ..config_at(&path)
        };

        provision(&config).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("ENC_ALGO=AES_128_GCM"));
    }

    #[test]
    fn test_unwritable_parent_surfaces_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let config = config_at(&blocker.join("sub").join("encjdbc.conf"));
        let err = provision(&config).unwrap_err();
        assert!(matches!(err, EncDbError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_artifact_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("encjdbc.conf");
        provision(&config_at(&path)).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
