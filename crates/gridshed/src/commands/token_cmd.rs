//! `token` and `login`: inspect and force-renew the cloud token.

use gridshed_config::CredentialStore;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Print the stored token and its validity window.
pub fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let store = CredentialStore::new(super::store_path(global));
    let state = store.load()?;

    let token = &state.token;
    let status = if token.is_valid_now() {
        "valid"
    } else {
        "expired"
    };

    println!("Status: {status}");
    println!("Window: {}", token.validity_window());
    if !global.quiet {
        println!("Token:  {}", token.token);
    }
    Ok(())
}

/// Discard the stored token, log in for a fresh one, and persist it.
pub async fn login(global: &GlobalOpts) -> Result<(), CliError> {
    let mut ctx = super::build_context(global)?;

    ctx.invalidate();
    let token = ctx.ensure_token().await?;

    if !global.quiet {
        println!("Logged in. New token window: {}", token.validity_window());
    }
    Ok(())
}
