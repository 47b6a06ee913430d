//! Durable storage for account configuration and the current cloud token.
//!
//! One JSON file, two top-level objects:
//!
//! ```json
//! {
//!   "config": {"username", "password", "serial", "envoy", "site_id"},
//!   "token":  {"token", "generation_time", "expires_at"}
//! }
//! ```
//!
//! Token timestamps are accepted as strings or numbers (whatever issued
//! them last). Saves go through a temp file + rename so a concurrent
//! `load` never observes a partial write.

use std::io;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use gridshed_api::CloudToken;

/// Default store location, next to the process working directory.
pub const DEFAULT_STORE_FILE: &str = "gridshed.config";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file does not exist. Startup cannot proceed without
    /// credentials; the CLI points the user at `config init`.
    #[error("credential store not found at {path}")]
    Missing { path: String },

    /// The file exists but required fields are absent or malformed
    /// (including token timestamps that don't coerce to integers).
    #[error("credential store is corrupt: {message}")]
    Corrupt { message: String },

    /// I/O failure reading or writing the store.
    #[error("credential store I/O error: {0}")]
    Io(#[from] io::Error),
}

// ── Persisted types ─────────────────────────────────────────────────

/// Account configuration: cloud credentials plus gateway identity.
///
/// Immutable after load except via explicit reconfiguration
/// (`gridshed config init`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Cloud account email.
    pub username: String,
    /// Cloud account password. Redacted in Debug output; exposed only at
    /// login-form encoding and store serialization.
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    /// Gateway serial number (scopes token issuance).
    pub serial: String,
    /// Gateway hostname or address on the local network.
    pub envoy: String,
    /// Cloud site identifier.
    pub site_id: String,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(secret.expose_secret())
}

/// Everything the store round-trips: account config + current token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub config: AccountConfig,
    pub token: CloudToken,
}

// ── Store ───────────────────────────────────────────────────────────

/// Handle to the credential store file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the persisted state.
    ///
    /// [`StoreError::Missing`] if the file does not exist,
    /// [`StoreError::Corrupt`] if it does not parse into a complete
    /// `PersistedState`.
    pub fn load(&self) -> Result<PersistedState, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    path: self.path.display().to_string(),
                });
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let state: PersistedState =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                message: e.to_string(),
            })?;

        debug!(path = %self.path.display(), "credential store loaded");
        Ok(state)
    }

    /// Overwrite the persisted state.
    ///
    /// Writes to `<path>.tmp` then renames, so a reader sees either the
    /// old state or the new one — never a partial file.
    pub fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(state).map_err(|e| StoreError::Corrupt {
            message: e.to_string(),
        })?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "credential store saved");
        Ok(())
    }
}
