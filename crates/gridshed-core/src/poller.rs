// ── Poll-and-react loop ──
//
// One task, one cycle at a time. Each cycle walks the credential chain
// (token → session) before touching the inventory endpoint, so a gateway
// call is never attempted with an expired token. Cycle failures are
// reported and swallowed; the scheduler always reaches the next tick.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gridshed_api::{CloudAuth, CloudToken, GatewayClient, TlsMode, TransportConfig};
use gridshed_config::{AccountConfig, CredentialStore, PersistedState};

use crate::error::CoreError;
use crate::summary::{self, GridStatus, InventorySummary};

/// Default interval between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ── Seams ───────────────────────────────────────────────────────────

/// Breaker actuation seam. Only the decision to invoke it lives here;
/// the body is site-specific.
pub trait BreakerControl {
    /// Invoked exactly once per poll cycle that observes the grid DOWN.
    /// Re-invoked on every subsequent DOWN cycle -- there is no
    /// debouncing, so implementations should tolerate repeat calls.
    fn trip(&mut self);
}

/// Stub breaker that only logs the decision.
pub struct LogBreaker;

impl BreakerControl for LogBreaker {
    fn trip(&mut self) {
        warn!("grid is down, turning off breakers");
    }
}

/// Where each cycle's summary goes.
pub trait SummarySink {
    fn emit(&mut self, summary: &InventorySummary);
}

/// Sink that emits through `tracing`.
pub struct TracingSink;

impl SummarySink for TracingSink {
    fn emit(&mut self, summary: &InventorySummary) {
        info!(
            grid = %summary.grid_status,
            battery_avg = summary.battery_level_avg,
            levels = ?summary.battery_levels,
            "poll summary"
        );
    }
}

// ── Credential context ──────────────────────────────────────────────

/// The full credential chain as explicit state: account config, current
/// cloud token, and the clients that renew and consume it.
///
/// Owned by the [`Poller`] and touched only by the single polling task,
/// so no locking is needed. Replaces the process-global session state a
/// naive implementation would keep.
pub struct CredentialContext {
    store: CredentialStore,
    account: AccountConfig,
    token: Option<CloudToken>,
    cloud: CloudAuth,
    gateway: GatewayClient,
}

impl CredentialContext {
    /// Build a context from freshly loaded persisted state.
    ///
    /// The cloud side always verifies certificates; `gateway_tls` is the
    /// configurable verification mode for the (often self-signed) Envoy.
    pub fn from_state(
        store: CredentialStore,
        state: PersistedState,
        gateway_tls: TlsMode,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let cloud = CloudAuth::new(&TransportConfig {
            timeout,
            ..TransportConfig::default()
        })?;
        let gateway = GatewayClient::new(
            &state.config.envoy,
            &TransportConfig {
                tls: gateway_tls,
                timeout,
                cookie_jar: None,
            },
        )?;
        Ok(Self::with_clients(store, state, cloud, gateway))
    }

    /// Build a context around pre-built clients (tests, staging).
    pub fn with_clients(
        store: CredentialStore,
        state: PersistedState,
        cloud: CloudAuth,
        gateway: GatewayClient,
    ) -> Self {
        Self {
            store,
            account: state.config,
            token: Some(state.token),
            cloud,
            gateway,
        }
    }

    /// The current token, if any. `None` after an invalidation.
    pub fn token(&self) -> Option<&CloudToken> {
        self.token.as_ref()
    }

    /// Return a valid token, logging in and persisting the replacement
    /// if the current one is missing or expired. Renewal is synchronous
    /// and happens strictly before any gateway call.
    pub async fn ensure_token(&mut self) -> Result<CloudToken, CoreError> {
        let now = Utc::now().timestamp();
        if let Some(ref token) = self.token {
            if token.is_valid(now) {
                return Ok(token.clone());
            }
            debug!(window = %token.validity_window(), "cloud token expired");
        }

        info!("no valid cloud token; logging in");
        let token = self
            .cloud
            .login(&self.account.username, &self.account.password, &self.account.serial)
            .await?;
        self.store.save(&PersistedState {
            config: self.account.clone(),
            token: token.clone(),
        })?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Walk the chain up to an established gateway session.
    pub async fn ensure_session(&mut self) -> Result<(), CoreError> {
        let token = self.ensure_token().await?;
        self.gateway.ensure_session(&token).await?;
        Ok(())
    }

    /// Token → session → inventory fetch.
    pub async fn fetch_inventory(&mut self) -> Result<Value, CoreError> {
        self.ensure_session().await?;
        Ok(self.gateway.ensemble_inventory().await?)
    }

    /// Token → session → full endpoint dump, for offline diagnosis.
    pub async fn snapshot(&mut self) -> Result<Value, CoreError> {
        self.ensure_session().await?;
        Ok(self.gateway.snapshot().await?)
    }

    /// Drop the token and cached session. The next cycle starts from a
    /// fresh login. Used after the gateway rejects a session bootstrap.
    pub fn invalidate(&mut self) {
        self.token = None;
        self.gateway.clear_session();
    }
}

// ── Poller ──────────────────────────────────────────────────────────

/// The poll scheduler: runs one cycle per tick, indefinitely.
pub struct Poller<B, S> {
    ctx: CredentialContext,
    breaker: B,
    sink: S,
}

impl<B: BreakerControl, S: SummarySink> Poller<B, S> {
    pub fn new(ctx: CredentialContext, breaker: B, sink: S) -> Self {
        Self { ctx, breaker, sink }
    }

    pub fn context(&self) -> &CredentialContext {
        &self.ctx
    }

    /// Tear the poller apart to inspect the seams (tests).
    pub fn into_parts(self) -> (CredentialContext, B, S) {
        (self.ctx, self.breaker, self.sink)
    }

    /// Run one poll cycle: ensure credentials, fetch, reduce, emit, and
    /// trip the breakers if the grid is down.
    ///
    /// A [`GatewayAuthRejected`](gridshed_api::Error::GatewayAuthRejected)
    /// is not retried within the cycle; it invalidates the context so the
    /// next cycle starts from `NO_TOKEN`.
    pub async fn cycle(&mut self) -> Result<InventorySummary, CoreError> {
        let result = self.run_cycle().await;
        if let Err(ref e) = result {
            if e.is_session_rejected() {
                debug!("gateway rejected session; next cycle will re-login");
                self.ctx.invalidate();
            }
        }
        result
    }

    async fn run_cycle(&mut self) -> Result<InventorySummary, CoreError> {
        let raw = self.ctx.fetch_inventory().await?;
        let summary = summary::reduce(&raw)?;
        self.sink.emit(&summary);
        if summary.grid_status == GridStatus::Down {
            self.breaker.trip();
        }
        Ok(summary)
    }

    /// Poll every `interval` until `cancel` fires.
    ///
    /// One cycle runs to completion before the next tick is considered;
    /// cancellation is only observed between cycles. A failed cycle is
    /// reported and the loop continues.
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "poll loop starting");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("poll loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.cycle().await {
                        warn!(
                            error = %e,
                            transient = e.is_transient(),
                            "poll cycle failed; continuing"
                        );
                    }
                }
            }
        }
    }
}
