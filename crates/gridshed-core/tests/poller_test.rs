// Poll-cycle integration tests: a mock cloud identity service plus a
// mock gateway, with the credential store on a tempdir.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gridshed_api::{CloudAuth, CloudToken, GatewayClient, TransportConfig};
use gridshed_config::{AccountConfig, CredentialStore, PersistedState};
use gridshed_core::{
    BreakerControl, CoreError, CredentialContext, GridStatus, InventorySummary, Poller,
    SummarySink,
};

// ── Fixtures ────────────────────────────────────────────────────────

fn token(value: &str, generation_time: i64, expires_at: i64) -> CloudToken {
    serde_json::from_value(json!({
        "token": value,
        "generation_time": generation_time,
        "expires_at": expires_at,
    }))
    .expect("token fixture")
}

fn live_token(value: &str) -> CloudToken {
    token(value, 0, i64::MAX)
}

fn expired_token(value: &str) -> CloudToken {
    token(value, 1_000, 2_000)
}

fn account(envoy: &str) -> AccountConfig {
    AccountConfig {
        username: "owner@example.com".into(),
        password: SecretString::from("hunter2".to_string()),
        serial: "202234051232".into(),
        envoy: envoy.into(),
        site_id: "3674932".into(),
    }
}

fn grid_up_body() -> serde_json::Value {
    json!([
        {"type": "ENPOWER", "devices": [{"mains_oper_state": "closed"}]},
        {"type": "ENCHARGE", "devices": [{"percentFull": "80"}, {"percentFull": "60"}]},
    ])
}

fn grid_down_body() -> serde_json::Value {
    json!([
        {"type": "ENPOWER", "devices": [{"mains_oper_state": "open"}]},
        {"type": "ENCHARGE", "devices": [{"percentFull": "40"}]},
    ])
}

struct CountingBreaker {
    trips: usize,
}

impl BreakerControl for CountingBreaker {
    fn trip(&mut self) {
        self.trips += 1;
    }
}

struct RecordingSink {
    summaries: Vec<InventorySummary>,
}

impl SummarySink for RecordingSink {
    fn emit(&mut self, summary: &InventorySummary) {
        self.summaries.push(summary.clone());
    }
}

async fn mount_session_ok(gateway: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/check_jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("valid"))
        .mount(gateway)
        .await;
}

async fn mount_inventory(gateway: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/ivp/ensemble/inventory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(gateway)
        .await;
}

async fn mount_login(cloud: &MockServer, issued: &CloudToken) {
    Mock::given(method("POST"))
        .and(path("/login/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(cloud)
        .await;
    Mock::given(method("GET"))
        .and(path("/entrez-auth-token"))
        .and(query_param("serial_num", "202234051232"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": issued.token,
            "generation_time": issued.generation_time,
            "expires_at": issued.expires_at,
        })))
        .expect(1)
        .mount(cloud)
        .await;
}

struct Harness {
    cloud: MockServer,
    gateway: MockServer,
    store: CredentialStore,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn new(initial: CloudToken) -> Self {
        let cloud = MockServer::start().await;
        let gateway = MockServer::start().await;

        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(dir.path().join("gridshed.config"));
        store
            .save(&PersistedState {
                config: account("envoy.local"),
                token: initial,
            })
            .expect("seed store");

        Self {
            cloud,
            gateway,
            store,
            _dir: dir,
        }
    }

    fn context(&self) -> CredentialContext {
        let transport = TransportConfig::default();
        let cloud = CloudAuth::with_base_url(
            Url::parse(&self.cloud.uri()).expect("cloud url"),
            &transport,
        )
        .expect("cloud client");
        let gateway = GatewayClient::with_base_url(
            Url::parse(&self.gateway.uri()).expect("gateway url"),
            &transport,
        )
        .expect("gateway client");
        let state = self.store.load().expect("load state");
        CredentialContext::with_clients(self.store.clone(), state, cloud, gateway)
    }

    fn poller(&self) -> Poller<CountingBreaker, RecordingSink> {
        Poller::new(
            self.context(),
            CountingBreaker { trips: 0 },
            RecordingSink {
                summaries: Vec::new(),
            },
        )
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn happy_cycle_emits_summary_and_leaves_breakers_alone() {
    let harness = Harness::new(live_token("jwt-live")).await;
    mount_session_ok(&harness.gateway).await;
    mount_inventory(&harness.gateway, grid_up_body()).await;

    let mut poller = harness.poller();
    let summary = poller.cycle().await.expect("cycle");

    assert_eq!(summary.grid_status, GridStatus::Up);
    assert_eq!(summary.battery_levels, vec![80, 60]);
}

#[tokio::test]
async fn expired_token_triggers_login_before_gateway_calls() {
    let harness = Harness::new(expired_token("jwt-stale")).await;
    mount_login(&harness.cloud, &live_token("jwt-fresh")).await;
    mount_session_ok(&harness.gateway).await;
    mount_inventory(&harness.gateway, grid_up_body()).await;

    let mut poller = harness.poller();
    poller.cycle().await.expect("cycle");

    // Renewal persisted the new token before the gateway was touched.
    let state = harness.store.load().expect("reload");
    assert_eq!(state.token.token, "jwt-fresh");
    harness.cloud.verify().await;
}

#[tokio::test]
async fn grid_down_trips_breakers_every_down_cycle() {
    let harness = Harness::new(live_token("jwt-live")).await;
    mount_session_ok(&harness.gateway).await;
    mount_inventory(&harness.gateway, grid_down_body()).await;

    let mut poller = harness.poller();
    poller.cycle().await.expect("first cycle");
    poller.cycle().await.expect("second cycle");

    // No debouncing: every DOWN observation re-actuates.
    let (_, breaker, sink) = poller.into_parts();
    assert_eq!(breaker.trips, 2);
    assert_eq!(sink.summaries.len(), 2);
    assert_eq!(sink.summaries[0].grid_status, GridStatus::Down);
}

#[tokio::test]
async fn session_rejection_forces_fresh_login_next_cycle() {
    let harness = Harness::new(live_token("jwt-revoked")).await;

    // First bootstrap attempt is refused; the mock then stops matching
    // and the later mount takes over.
    Mock::given(method("GET"))
        .and(path("/auth/check_jwt"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&harness.gateway)
        .await;

    let mut poller = harness.poller();
    let err = poller.cycle().await.expect_err("rejected cycle");
    assert!(err.is_session_rejected(), "got: {err:?}");
    assert!(poller.context().token().is_none(), "token not invalidated");

    // Next cycle starts from NO_TOKEN: full login, then a clean run.
    mount_login(&harness.cloud, &live_token("jwt-relogin")).await;
    mount_session_ok(&harness.gateway).await;
    mount_inventory(&harness.gateway, grid_up_body()).await;

    let summary = poller.cycle().await.expect("recovered cycle");
    assert_eq!(summary.grid_status, GridStatus::Up);
    harness.cloud.verify().await;
}

#[tokio::test]
async fn failed_fetch_does_not_touch_breakers() {
    let harness = Harness::new(live_token("jwt-live")).await;
    mount_session_ok(&harness.gateway).await;
    Mock::given(method("GET"))
        .and(path("/ivp/ensemble/inventory"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&harness.gateway)
        .await;

    let mut poller = harness.poller();
    let err = poller.cycle().await.expect_err("cycle should fail");
    assert!(
        matches!(err, CoreError::Api(gridshed_api::Error::GatewayBadResponse { .. })),
        "got: {err:?}"
    );
    // A bad response is not a transient network failure.
    assert!(!err.is_transient());

    let (_, breaker, sink) = poller.into_parts();
    assert_eq!(breaker.trips, 0);
    assert!(sink.summaries.is_empty());
}

#[tokio::test]
async fn malformed_inventory_is_a_reduction_error() {
    let harness = Harness::new(live_token("jwt-live")).await;
    mount_session_ok(&harness.gateway).await;
    mount_inventory(
        &harness.gateway,
        json!([{"type": "ENCHARGE", "devices": [{"percentFull": "80"}]}]),
    )
    .await;

    let mut poller = harness.poller();
    let err = poller.cycle().await.expect_err("cycle should fail");
    assert!(matches!(err, CoreError::MissingDevice { .. }), "got: {err:?}");
}

#[tokio::test]
async fn run_stops_when_cancelled() {
    let harness = Harness::new(live_token("jwt-live")).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut poller = harness.poller();
    // The cancel branch is biased, so no cycle runs and no mock is hit.
    tokio::time::timeout(
        Duration::from_secs(1),
        poller.run(Duration::from_secs(60), cancel),
    )
    .await
    .expect("run should return promptly");
}
