// ── Core error types ──
//
// Store, auth, gateway, and reduction errors are not handled in their own
// layers -- they propagate here and surface at the poll cycle, which is
// the sole recovery boundary. The CLI maps these into diagnostics.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Reduction errors ─────────────────────────────────────────────
    /// The inventory has no entry of the required device-group type.
    #[error("no {device} entry in the ensemble inventory")]
    MissingDevice { device: String },

    /// A battery device is missing `percentFull` or it is not an integer.
    #[error("battery field error: {reason}")]
    BatteryField { reason: String },

    /// The battery bank lists no devices; an average over zero devices
    /// is an error, never a silent division by zero.
    #[error("battery bank lists no devices")]
    NoBatteries,

    // ── Wrapped layers ───────────────────────────────────────────────
    #[error(transparent)]
    Api(#[from] gridshed_api::Error),

    #[error(transparent)]
    Store(#[from] gridshed_config::StoreError),
}

impl CoreError {
    /// Returns `true` if the gateway rejected the session bootstrap.
    ///
    /// The poller reacts by dropping the token so the next cycle starts
    /// from a fresh cloud login.
    pub fn is_session_rejected(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_auth_rejected())
    }

    /// Returns `true` for transient network failures the next cycle may
    /// simply outlive. Reduction and store errors are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_transient())
    }
}
