// Envoy gateway HTTP client.
//
// The gateway trades a valid cloud bearer token for a local cookie
// session (`/auth/check_jwt` sets `sessionId` in the jar). The session is
// cached and bound to the exact token that created it; a cache hit makes
// `ensure_session` a no-op with no network traffic.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::token::CloudToken;
use crate::transport::TransportConfig;

const SESSION_PATH: &str = "/auth/check_jwt";
const ENSEMBLE_INVENTORY_PATH: &str = "/ivp/ensemble/inventory";

/// Cached gateway session state.
///
/// The cookie itself lives in the client's jar; this records which token
/// bootstrapped it so renewal invalidates the cache. Never persisted.
#[derive(Debug, Clone)]
struct SessionHandle {
    bound_token: CloudToken,
}

/// Client for the Envoy gateway's local API.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    session: Option<SessionHandle>,
}

impl GatewayClient {
    /// Create a client for a gateway host (e.g. `envoy.local`).
    pub fn new(envoy_host: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("https://{envoy_host}"))?;
        Self::with_base_url(base_url, transport)
    }

    /// Create a client against an arbitrary base URL (tests).
    pub fn with_base_url(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        // The gateway session is cookie-based; add a jar if the caller didn't.
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            session: None,
        })
    }

    /// Whether a session is currently cached.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Drop the cached session. The next call re-bootstraps.
    pub fn clear_session(&mut self) {
        self.session = None;
    }

    // ── Session bootstrap ────────────────────────────────────────────

    /// Ensure an authenticated gateway session exists for `token`.
    ///
    /// Idempotent: if the cached session was created with this same,
    /// still-valid token, returns without any network call. Otherwise
    /// performs a single `GET /auth/check_jwt` with the bearer token.
    ///
    /// Errors: [`Error::GatewayUnreachable`] on transport failure,
    /// [`Error::GatewayAuthRejected`] on a non-success response — the
    /// gateway refused a token the cloud considered valid, so the caller
    /// should force a fresh login rather than retry.
    pub async fn ensure_session(&mut self, token: &CloudToken) -> Result<(), Error> {
        if let Some(ref handle) = self.session {
            if handle.bound_token.token == token.token && token.is_valid_now() {
                return Ok(());
            }
        }

        let url = self.base_url.join(SESSION_PATH)?;
        debug!("bootstrapping gateway session at {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(&token.token)
            .send()
            .await
            .map_err(Error::GatewayUnreachable)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::GatewayAuthRejected {
                status: status.as_u16(),
            });
        }

        // The jar now holds the sessionId cookie; remember the binding.
        self.session = Some(SessionHandle {
            bound_token: token.clone(),
        });
        debug!("gateway session established");
        Ok(())
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the ensemble inventory: device groups (grid-tie controller,
    /// battery bank) and their live state. Drives the poll policy.
    pub async fn ensemble_inventory(&self) -> Result<Value, Error> {
        self.get_json(self.base_url.join(ENSEMBLE_INVENTORY_PATH)?)
            .await
    }

    /// Fetch the gateway's home status page.
    pub async fn home(&self) -> Result<Value, Error> {
        self.get_json(self.base_url.join("/home.json")?).await
    }

    /// Fetch production data.
    pub async fn production(&self, details: u8) -> Result<Value, Error> {
        let mut url = self.base_url.join("/production.json")?;
        url.query_pairs_mut()
            .append_pair("details", &details.to_string());
        self.get_json(url).await
    }

    /// Fetch aggregate production totals.
    pub async fn production_summary(&self) -> Result<Value, Error> {
        self.get_json(self.base_url.join("/api/v1/production")?)
            .await
    }

    /// Fetch the hardware inventory (panels, relays).
    pub async fn inventory(&self, deleted: u8) -> Result<Value, Error> {
        let mut url = self.base_url.join("/inventory.json")?;
        url.query_pairs_mut()
            .append_pair("deleted", &deleted.to_string());
        self.get_json(url).await
    }

    /// Fetch meter configuration and readings.
    pub async fn meters(&self) -> Result<Value, Error> {
        self.get_json(self.base_url.join("/ivp/meters")?).await
    }

    /// Fetch per-inverter production figures.
    pub async fn production_inverters(&self) -> Result<Value, Error> {
        self.get_json(self.base_url.join("/api/v1/production/inverters")?)
            .await
    }

    /// Fetch the gateway's network interface status.
    pub async fn network_display(&self) -> Result<Value, Error> {
        self.get_json(self.base_url.join("/admin/lib/network_display.json")?)
            .await
    }

    /// Fetch the gateway's debug/diagnostics blob.
    pub async fn dba(&self) -> Result<Value, Error> {
        self.get_json(self.base_url.join("/admin/lib/dba.json")?)
            .await
    }

    /// Fetch every read-only endpoint into one JSON object, keyed by
    /// endpoint name. Useful for offline diagnosis of a site.
    pub async fn snapshot(&self) -> Result<Value, Error> {
        let mut snapshot = serde_json::Map::new();
        snapshot.insert("home".into(), self.home().await?);
        snapshot.insert("production".into(), self.production(1).await?);
        snapshot.insert(
            "production_summary".into(),
            self.production_summary().await?,
        );
        snapshot.insert(
            "production_inverters".into(),
            self.production_inverters().await?,
        );
        snapshot.insert("inventory".into(), self.inventory(1).await?);
        snapshot.insert(
            "ensemble_inventory".into(),
            self.ensemble_inventory().await?,
        );
        snapshot.insert("meters".into(), self.meters().await?);
        snapshot.insert("network_display".into(), self.network_display().await?);
        snapshot.insert("dba".into(), self.dba().await?);
        Ok(Value::Object(snapshot))
    }

    // ── Request helper ───────────────────────────────────────────────

    /// Send a GET using the established session and parse the JSON body.
    ///
    /// No retry here — retry policy belongs to the poll loop.
    async fn get_json(&self, url: Url) -> Result<Value, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(Error::GatewayUnreachable)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::GatewayBadResponse {
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let body = resp.text().await.map_err(Error::GatewayUnreachable)?;
        serde_json::from_str(&body).map_err(|e| Error::GatewayBadResponse {
            message: format!("{e} (body preview: {:?})", preview(&body)),
        })
    }
}

/// First 200 characters of a response body, for error messages.
fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
