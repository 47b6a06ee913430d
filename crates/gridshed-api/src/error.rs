use thiserror::Error;

/// Top-level error type for the `gridshed-api` crate.
///
/// The cloud and gateway surfaces fail differently on purpose: a gateway
/// rejecting a bearer token the cloud considers valid must be surfaced as
/// [`GatewayAuthRejected`](Error::GatewayAuthRejected) so the caller can
/// force a fresh login instead of retrying the same token.
#[derive(Debug, Error)]
pub enum Error {
    // ── Cloud authentication ────────────────────────────────────────
    /// Login rejected by the identity service (wrong credentials,
    /// locked account, non-2xx response).
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The token response could not be parsed into a valid token
    /// (missing field, non-integer timestamp, inverted validity window).
    /// Distinct from an *expired* token, which is a normal `false` from
    /// [`CloudToken::is_valid`](crate::token::CloudToken::is_valid).
    #[error("Malformed cloud token: {message}")]
    TokenFormat { message: String },

    /// HTTP transport error while talking to the cloud service.
    #[error("Cloud transport error: {0}")]
    CloudTransport(#[source] reqwest::Error),

    // ── Gateway ─────────────────────────────────────────────────────
    /// The gateway could not be reached (connection refused, DNS
    /// failure, timeout).
    #[error("Gateway unreachable: {0}")]
    GatewayUnreachable(#[source] reqwest::Error),

    /// The gateway refused the bearer token at session bootstrap.
    #[error("Gateway rejected the bearer token (HTTP {status})")]
    GatewayAuthRejected { status: u16 },

    /// Non-success status or unparseable body from a gateway endpoint.
    #[error("Gateway returned a bad response: {message}")]
    GatewayBadResponse { message: String },

    // ── Transport setup ─────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Returns `true` if the gateway rejected the session bootstrap.
    ///
    /// The poll loop uses this to drop the current token and start the
    /// next cycle from a fresh cloud login.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::GatewayAuthRejected { .. })
    }

    /// Returns `true` if this is a transient network failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::GatewayUnreachable(e) | Self::CloudTransport(e) => {
                e.is_timeout() || e.is_connect()
            }
            _ => false,
        }
    }
}
