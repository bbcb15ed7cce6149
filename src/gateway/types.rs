//! Gateway request and result types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Verification status of a presented host key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostKeyStatus {
    /// First time connecting to this host
    Unknown,
    /// Host key changed from the trusted entry - possible MITM attack!
    Changed {
        /// Fingerprint that was trusted before
        #[serde(rename = "expectedFingerprint")]
        expected_fingerprint: String,
    },
}

/// Host identity presented by the server and awaiting a trust decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostIdentity {
    pub host: String,
    pub port: u16,
    /// Key type (e.g., "ssh-ed25519", "ssh-rsa")
    pub key_type: String,
    /// SHA256 fingerprint (e.g., "SHA256:abc123...")
    pub fingerprint: String,
    pub status: HostKeyStatus,
}

impl HostIdentity {
    pub fn unknown(
        host: impl Into<String>,
        port: u16,
        key_type: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            key_type: key_type.into(),
            fingerprint: fingerprint.into(),
            status: HostKeyStatus::Unknown,
        }
    }

    pub fn changed(
        host: impl Into<String>,
        port: u16,
        key_type: impl Into<String>,
        fingerprint: impl Into<String>,
        expected_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            key_type: key_type.into(),
            fingerprint: fingerprint.into(),
            status: HostKeyStatus::Changed {
                expected_fingerprint: expected_fingerprint.into(),
            },
        }
    }

    /// True when a previously trusted fingerprint no longer matches
    pub fn is_mismatch(&self) -> bool {
        matches!(self.status, HostKeyStatus::Changed { .. })
    }

    /// Same presented key, regardless of verification status
    pub fn same_key_as(&self, other: &HostIdentity) -> bool {
        self.host.eq_ignore_ascii_case(&other.host)
            && self.port == other.port
            && self.key_type == other.key_type
            && self.fingerprint == other.fingerprint
    }
}

/// Secrets attached to a single gateway call
#[derive(Clone, Default)]
pub struct Credentials {
    pub password: Option<Zeroizing<String>>,
    pub passphrase: Option<Zeroizing<String>>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(Zeroizing::new(password.into())),
            passphrase: None,
        }
    }

    pub fn passphrase(passphrase: impl Into<String>) -> Self {
        Self {
            password: None,
            passphrase: Some(Zeroizing::new(passphrase.into())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.passphrase.is_none()
    }

    pub fn password_str(&self) -> Option<&str> {
        self.password.as_deref().map(String::as_str)
    }

    pub fn passphrase_str(&self) -> Option<&str> {
        self.passphrase.as_deref().map(String::as_str)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Successful result shape shared by `connect` and `reconnect_after_trust`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Authenticated session established
    Connected { session_id: String },
    /// Server presented a host key that needs user confirmation
    NeedsTrustConfirmation(HostIdentity),
}

/// Information about an established session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub profile_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub connected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials::password("hunter2");
        let debug_str = format!("{:?}", creds);
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("<redacted>"));
        assert_eq!(creds.password_str(), Some("hunter2"));
        assert!(creds.passphrase_str().is_none());
    }

    #[test]
    fn test_same_key_ignores_status() {
        let a = HostIdentity::unknown("Example.com", 22, "ssh-ed25519", "SHA256:abc");
        let b = HostIdentity::changed("example.com", 22, "ssh-ed25519", "SHA256:abc", "SHA256:old");
        assert!(a.same_key_as(&b));
        assert!(b.is_mismatch());
        assert!(!a.is_mismatch());

        let c = HostIdentity::unknown("example.com", 22, "ssh-ed25519", "SHA256:def");
        assert!(!a.same_key_as(&c));
    }

    #[test]
    fn test_host_identity_serialization() {
        let identity =
            HostIdentity::changed("example.com", 2222, "ssh-rsa", "SHA256:new", "SHA256:old");
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["keyType"], "ssh-rsa");
        assert_eq!(json["status"]["status"], "changed");
        assert_eq!(json["status"]["expectedFingerprint"], "SHA256:old");
        assert!(json["status"].get("expected_fingerprint").is_none());

        let back: HostIdentity = serde_json::from_value(json).unwrap();
        assert_eq!(back, identity);
    }
}
