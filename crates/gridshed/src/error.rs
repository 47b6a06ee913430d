//! CLI error types with miette diagnostics.
//!
//! Maps core and store errors into user-facing diagnostics with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use gridshed_config::StoreError;
use gridshed_core::CoreError;

/// Exit codes for scripted callers.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFIG: i32 = 4;
    pub const GATEWAY: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Credential store not found")]
    #[diagnostic(
        code(gridshed::no_config),
        help(
            "Create one with: gridshed config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Credential store is corrupt: {message}")]
    #[diagnostic(
        code(gridshed::corrupt_config),
        help("Re-create the store with: gridshed config init")
    )]
    CorruptConfig { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Cloud authentication failed: {message}")]
    #[diagnostic(
        code(gridshed::auth_failed),
        help(
            "Verify the account email and password in the store.\n\
             Re-run: gridshed config init"
        )
    )]
    AuthFailed { message: String },

    #[error("Gateway rejected the session (HTTP {status})")]
    #[diagnostic(
        code(gridshed::gateway_rejected),
        help(
            "The gateway refused a token the cloud considers valid.\n\
             Force a fresh token with: gridshed login"
        )
    )]
    GatewayRejected { status: u16 },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the gateway")]
    #[diagnostic(
        code(gridshed::gateway_unreachable),
        help(
            "Check that the Envoy is on the local network and reachable.\n\
             Self-signed certificate? Add --insecure (-k)."
        )
    )]
    GatewayUnreachable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not reach the cloud identity service")]
    #[diagnostic(code(gridshed::cloud_unreachable))]
    CloudUnreachable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Gateway returned an unusable response: {message}")]
    #[diagnostic(code(gridshed::bad_response))]
    BadResponse { message: String },

    #[error("Inventory reduction failed: {message}")]
    #[diagnostic(
        code(gridshed::reduction),
        help("Capture the raw payload for diagnosis with: gridshed snapshot")
    )]
    Reduction { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gridshed::validation))]
    Validation { field: String, reason: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(gridshed::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::GatewayRejected { .. } => exit_code::GATEWAY,
            Self::NoConfig { .. } | Self::CorruptConfig { .. } => exit_code::CONFIG,
            Self::GatewayUnreachable { .. } | Self::CloudUnreachable { .. } => {
                exit_code::CONNECTION
            }
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Layer mappings ───────────────────────────────────────────────────

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { path } => Self::NoConfig { path },
            StoreError::Corrupt { message } => Self::CorruptConfig { message },
            StoreError::Io(e) => Self::Io(e),
        }
    }
}

impl From<gridshed_api::Error> for CliError {
    fn from(err: gridshed_api::Error) -> Self {
        use gridshed_api::Error;
        match err {
            Error::AuthenticationFailed { message } | Error::TokenFormat { message } => {
                Self::AuthFailed { message }
            }
            Error::CloudTransport(e) => Self::CloudUnreachable { source: e.into() },
            Error::GatewayUnreachable(e) => Self::GatewayUnreachable { source: e.into() },
            Error::GatewayAuthRejected { status } => Self::GatewayRejected { status },
            Error::GatewayBadResponse { message } => Self::BadResponse { message },
            Error::InvalidUrl(e) => Self::Validation {
                field: "envoy".into(),
                reason: e.to_string(),
            },
            Error::Tls(message) => Self::GatewayUnreachable {
                source: message.into(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => e.into(),
            CoreError::Store(e) => e.into(),
            reduction => Self::Reduction {
                message: reduction.to_string(),
            },
        }
    }
}
