//! Session commands for the rota-session CLI.
//!
//! Each command wires [`SessionSync`] to the REST adapters, lets it settle,
//! and prints the result as JSON on stdout. Logs go to stderr.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use super::categorized;
use crate::adapters::{FileStorage, ReqwestHttpClient, RestIdentityProvider, RestProfileStore};
use crate::config::SessionConfig;
use crate::domain::{Identity, Profile};
use crate::session::{SessionDeps, SessionState, SessionStatus, SessionSync};
use crate::traits::{HttpClient, LocalStorage};

/// How long `sign-out` waits for the sign-out event to land.
const SIGN_OUT_SETTLE: Duration = Duration::from_secs(2);

/// The REST adapters, wired from configuration.
pub struct Backend {
    pub identity: Arc<RestIdentityProvider>,
    pub deps: SessionDeps,
}

impl Backend {
    pub fn connect(config: &SessionConfig) -> Result<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let storage: Arc<dyn LocalStorage> = match &config.storage_path {
            Some(path) => Arc::new(FileStorage::with_path(path)),
            None => Arc::new(FileStorage::new().map_err(categorized)?),
        };

        let identity = Arc::new(RestIdentityProvider::from_config(
            config,
            http.clone(),
            storage.clone(),
        )
        .map_err(categorized)?);
        let profiles =
            Arc::new(RestProfileStore::from_config(config, http).map_err(categorized)?);

        Ok(Self {
            deps: SessionDeps {
                provider: identity.clone(),
                profiles,
                storage,
            },
            identity,
        })
    }
}

/// JSON shape printed for a session state.
#[derive(Debug, Serialize)]
struct StateView<'a> {
    status: SessionStatus,
    identity: Option<&'a Identity>,
    role: Option<String>,
    profile: Option<&'a Profile>,
}

impl<'a> From<&'a SessionState> for StateView<'a> {
    fn from(state: &'a SessionState) -> Self {
        Self {
            status: state.status(),
            identity: state.identity.as_ref(),
            role: state
                .profile
                .as_ref()
                .and_then(Profile::role_kind)
                .map(|role| role.to_string()),
            profile: state.profile.as_ref(),
        }
    }
}

fn print_state(state: &SessionState) -> Result<()> {
    let json = serde_json::to_string(&StateView::from(state))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()?;
    Ok(())
}

/// `status`: resolve once and print.
pub async fn handle_status_command(config: &SessionConfig) -> Result<()> {
    let backend = Backend::connect(config)?;
    let sync = SessionSync::start(backend.deps, config).map_err(categorized)?;

    let state = sync.wait_until_loaded().await;
    print_state(&state)?;

    sync.shutdown().await;
    Ok(())
}

/// `watch`: print every committed state until Ctrl-C.
pub async fn handle_watch_command(config: &SessionConfig) -> Result<()> {
    let backend = Backend::connect(config)?;
    let sync = SessionSync::start(backend.deps, config).map_err(categorized)?;
    let mut changes = sync.changes();

    print_state(&changes.borrow_and_update().clone())?;
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                print_state(&state)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted, stopping watch");
                break;
            }
        }
    }

    sync.shutdown().await;
    Ok(())
}

/// `sign-in <email>`: prompt for the password, sign in, print the resolved session.
pub async fn handle_sign_in_command(config: &SessionConfig, email: &str) -> Result<()> {
    let backend = Backend::connect(config)?;

    print!("Password for {}: ", email);
    std::io::stdout().flush()?;
    let password = rpassword::read_password().wrap_err("Failed to read password")?;
    if password.is_empty() {
        return Err(eyre!("Password must not be empty"));
    }

    backend
        .identity
        .sign_in_with_password(email, &password)
        .await
        .wrap_err("Sign-in failed")?;

    let sync = SessionSync::start(backend.deps, config).map_err(categorized)?;
    let state = sync.wait_until_loaded().await;
    print_state(&state)?;
    sync.shutdown().await;
    Ok(())
}

/// `sign-out`: end the session and print the cleared state.
pub async fn handle_sign_out_command(config: &SessionConfig) -> Result<()> {
    let backend = Backend::connect(config)?;
    let sync = SessionSync::start(backend.deps, config).map_err(categorized)?;

    let state = sync.wait_until_loaded().await;
    if state.identity.is_none() {
        eprintln!("Not signed in.");
        print_state(&state)?;
        sync.shutdown().await;
        return Ok(());
    }

    sync.sign_out().await;

    let mut changes = sync.changes();
    let settled = tokio::time::timeout(
        SIGN_OUT_SETTLE,
        changes.wait_for(|state| state.identity.is_none()),
    )
    .await
    .is_ok();
    if !settled {
        tracing::warn!("Sign-out event did not arrive within {:?}", SIGN_OUT_SETTLE);
    }

    print_state(&sync.state())?;
    sync.shutdown().await;
    Ok(())
}
