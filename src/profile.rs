//! Connection Profiles
//!
//! A profile identifies a remote target and points at previously stored
//! secrets. It never carries secret values itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authentication kind of a saved profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// Password authentication
    Password,
    /// Private key authentication (possibly passphrase protected)
    Key,
}

/// Saved connection target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    /// Unique profile ID
    pub id: String,
    /// Target hostname or IP
    pub host: String,
    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username for authentication
    pub username: String,
    /// Authentication kind
    pub auth: AuthKind,
    /// Reference to a stored password (keychain ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_ref: Option<String>,
    /// Path to the private key file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
    /// Reference to a stored key passphrase (keychain ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_ref: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl ConnectionProfile {
    /// Generate a new unique profile ID
    pub fn generate_id() -> String {
        format!("profile-{}", Uuid::new_v4())
    }

    /// Create a password profile with no stored password
    pub fn password(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            id: Self::generate_id(),
            host: host.into(),
            port,
            username: username.into(),
            auth: AuthKind::Password,
            password_ref: None,
            key_path: None,
            passphrase_ref: None,
        }
    }

    /// Create a key profile
    pub fn key(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        key_path: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            host: host.into(),
            port,
            username: username.into(),
            auth: AuthKind::Key,
            password_ref: None,
            key_path: Some(key_path.into()),
            passphrase_ref: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_password_ref(mut self, password_ref: impl Into<String>) -> Self {
        self.password_ref = Some(password_ref.into());
        self
    }

    pub fn with_passphrase_ref(mut self, passphrase_ref: impl Into<String>) -> Self {
        self.passphrase_ref = Some(passphrase_ref.into());
        self
    }

    /// Whether a password has been saved for this profile
    pub fn has_stored_password(&self) -> bool {
        self.password_ref.is_some()
    }

    /// Get display name (`user@host`, with port when non-default)
    pub fn display_name(&self) -> String {
        if self.port == 22 {
            format!("{}@{}", self.username, self.host)
        } else {
            format!("{}@{}:{}", self.username, self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let profile = ConnectionProfile::password("example.com", 22, "alice");
        assert_eq!(profile.display_name(), "alice@example.com");

        let profile = ConnectionProfile::password("example.com", 2222, "alice");
        assert_eq!(profile.display_name(), "alice@example.com:2222");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ConnectionProfile::password("a.example.com", 22, "root");
        let b = ConnectionProfile::password("a.example.com", 22, "root");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("profile-"));
    }

    #[test]
    fn test_stored_password() {
        let profile = ConnectionProfile::password("example.com", 22, "alice");
        assert!(!profile.has_stored_password());
        assert!(profile.with_password_ref("kc-1").has_stored_password());
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"id":"p1","host":"h","username":"u","auth":"key","keyPath":"~/.ssh/id_ed25519"}"#;
        let profile: ConnectionProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.port, 22);
        assert_eq!(profile.auth, AuthKind::Key);
        assert_eq!(profile.key_path.as_deref(), Some("~/.ssh/id_ed25519"));
        assert!(profile.passphrase_ref.is_none());
    }
}
