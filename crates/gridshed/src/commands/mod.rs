//! Command dispatch and shared setup helpers.

pub mod config_cmd;
pub mod snapshot;
pub mod token_cmd;
pub mod watch;

use std::path::PathBuf;
use std::time::Duration;

use gridshed_api::TlsMode;
use gridshed_config::{CredentialStore, DEFAULT_STORE_FILE};
use gridshed_core::CredentialContext;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::watch(args, global).await,
        Command::Status => watch::status(global).await,
        Command::Token => token_cmd::show(global),
        Command::Login => token_cmd::login(global).await,
        Command::Snapshot(args) => snapshot::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global).await,
    }
}

/// Resolve the credential store path from flags and environment.
pub fn store_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
}

/// TLS mode for the gateway side, from `--insecure`.
pub fn gateway_tls(global: &GlobalOpts) -> TlsMode {
    if global.insecure {
        TlsMode::DangerAcceptInvalid
    } else {
        TlsMode::System
    }
}

/// Load the store and build a ready credential context.
pub fn build_context(global: &GlobalOpts) -> Result<CredentialContext, CliError> {
    let store = CredentialStore::new(store_path(global));
    let state = store.load()?;
    let ctx = CredentialContext::from_state(
        store,
        state,
        gateway_tls(global),
        Duration::from_secs(global.timeout),
    )?;
    Ok(ctx)
}
