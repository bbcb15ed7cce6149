//! ssh-negotiator - resumable SSH connection negotiation
//!
//! Turns a saved connection profile into an authenticated, trusted session.
//! Credential prompts and host key confirmation are separate steps the
//! caller answers, and every abandoned or rejected attempt is torn down
//! without leaving secrets or partial state behind.
//!
//! The transport itself lives behind the [`gateway::Gateway`] trait.

pub mod config;
pub mod gateway;
pub mod negotiation;
pub mod profile;

#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{ConfigFile, ConfigStorage, NegotiationOptions, RetrustPolicy, StorageError};
pub use gateway::{ConnectOutcome, Credentials, Gateway, GatewayError, HostIdentity, SessionInfo};
pub use negotiation::{ConnectEvent, ConnectStep, ConnectionController, NegotiationError, Phase};
pub use profile::{AuthKind, ConnectionProfile};

/// Initialize logging
///
/// `RUST_LOG` wins over `filter`; without either, `info` is used.
/// Safe to call more than once.
pub fn init_logging(filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or("info")));

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        tracing::debug!("Logging already initialized");
    }
}

/// Load the saved settings, install logging with the configured filter and
/// build a controller on top of `gateway`
pub async fn load_controller(
    storage: &ConfigStorage,
    gateway: Arc<dyn Gateway>,
) -> Result<ConnectionController, StorageError> {
    let config = storage.load().await?;
    init_logging(config.log_filter.as_deref());
    tracing::info!("Loaded settings from {:?}", storage.path());
    Ok(ConnectionController::from_config(gateway, &config))
}
