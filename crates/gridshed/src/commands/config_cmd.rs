//! Config subcommand handlers: create, inspect, and locate the store.

use secrecy::{ExposeSecret, SecretString};

use gridshed_api::{CloudAuth, TransportConfig};
use gridshed_config::{AccountConfig, CredentialStore, PersistedState};

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts};
use crate::error::CliError;

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => handle_init(init, global).await,
        ConfigCommand::Show => handle_show(global),
        ConfigCommand::Path => {
            println!("{}", super::store_path(global).display());
            Ok(())
        }
    }
}

/// Build the store from scratch: collect the account identity, log in
/// once to prove it works, and persist config + token together.
async fn handle_init(args: ConfigInitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let password = match args.password {
        Some(p) => p,
        None => rpassword::prompt_password("Cloud account password: ").map_err(|e| {
            CliError::Validation {
                field: "password".into(),
                reason: format!("prompt failed: {e}"),
            }
        })?,
    };
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    let account = AccountConfig {
        username: args.username,
        password: SecretString::from(password),
        serial: args.serial,
        envoy: args.envoy,
        site_id: args.site_id,
    };

    // Prove the credentials before persisting anything.
    let cloud = CloudAuth::new(&TransportConfig::default())?;
    let token = cloud
        .login(&account.username, &account.password, &account.serial)
        .await?;

    let path = super::store_path(global);
    let store = CredentialStore::new(&path);
    store.save(&PersistedState {
        config: account,
        token,
    })?;

    if !global.quiet {
        eprintln!("Credential store written to {}", path.display());
        eprintln!("Try it: gridshed status --insecure");
    }
    Ok(())
}

/// Print the store contents with the password redacted.
fn handle_show(global: &GlobalOpts) -> Result<(), CliError> {
    let store = CredentialStore::new(super::store_path(global));
    let state = store.load()?;

    let mut doc = serde_json::to_value(&state)?;
    if let Some(password) = doc.pointer_mut("/config/password") {
        // Length leaks nothing useful; the value would.
        let redacted = "*".repeat(state.config.password.expose_secret().len().min(8));
        *password = serde_json::Value::String(redacted);
    }
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
