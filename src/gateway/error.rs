//! Gateway Error types

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

/// Signaled kind of a gateway error, without its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    AuthRequired,
    AuthFailed,
    NetworkError,
    Timeout,
    Io,
    Other,
}

impl GatewayError {
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::AuthRequired(_) => GatewayErrorKind::AuthRequired,
            GatewayError::AuthFailed(_) => GatewayErrorKind::AuthFailed,
            GatewayError::NetworkError(_) => GatewayErrorKind::NetworkError,
            GatewayError::Timeout(_) => GatewayErrorKind::Timeout,
            GatewayError::Io(_) => GatewayErrorKind::Io,
            GatewayError::Other(_) => GatewayErrorKind::Other,
        }
    }

    /// Whether the server rejected (or has not yet received) credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthRequired(_) | GatewayError::AuthFailed(_)
        )
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.to_string())
    }
}

// Frontends receive errors as plain strings
impl Serialize for GatewayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
