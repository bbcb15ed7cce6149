//! Gateway module - the credential/trust boundary
//!
//! The gateway speaks the remote protocol, performs key exchange and keeps
//! sessions alive. The negotiation core only drives it through the
//! [`Gateway`] trait.
//!
//! # Contract
//! - `connect` / `reconnect_after_trust` either establish a session, ask for
//!   a host key decision, or fail with a typed [`GatewayError`]
//! - `trust_host_identity` is idempotent: trusting an already trusted
//!   identity succeeds without changes
//! - `get_session_info` is for callers after a successful attempt

mod error;
pub mod known_hosts;
mod types;

use async_trait::async_trait;

pub use error::{GatewayError, GatewayErrorKind};
pub use known_hosts::{HostKeyVerification, KnownHostsError, KnownHostsStore};
pub use types::{ConnectOutcome, Credentials, HostIdentity, HostKeyStatus, SessionInfo};

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Open and authenticate a session for a saved profile
    async fn connect(
        &self,
        profile_id: &str,
        credentials: Credentials,
    ) -> Result<ConnectOutcome, GatewayError>;

    /// Persist trust for a presented host identity
    async fn trust_host_identity(&self, identity: &HostIdentity) -> Result<(), GatewayError>;

    /// Retry the connection once the host identity has been trusted
    async fn reconnect_after_trust(
        &self,
        profile_id: &str,
        credentials: Credentials,
    ) -> Result<ConnectOutcome, GatewayError>;

    /// Look up an established session
    async fn get_session_info(&self, session_id: &str) -> Result<Option<SessionInfo>, GatewayError>;
}
