//! Negotiation Error types

use thiserror::Error;

use super::state::Phase;
use crate::gateway::GatewayError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("Another connection attempt is in progress ({phase})")]
    Busy { phase: Phase },

    #[error("{operation} is not valid while {actual}")]
    InvalidPhase {
        operation: &'static str,
        actual: Phase,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Host identity rejected")]
    HostIdentityRejected,

    #[error("Server requested host key confirmation again ({fingerprint})")]
    RepeatedTrustRequest { fingerprint: String },

    #[error("Failed to trust host identity: {0}")]
    TrustFailed(GatewayError),
}

// Frontends receive errors as plain strings
impl serde::Serialize for NegotiationError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
