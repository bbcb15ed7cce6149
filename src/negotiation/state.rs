//! Attempt state
//!
//! A single owner for everything scoped to one connection attempt. `Idle`
//! is the absence of an attempt, so dropping the attempt is the only reset
//! path and cached secrets are wiped with it.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::gateway::{Credentials, HostIdentity};
use crate::profile::ConnectionProfile;

/// Monotonic identity of a connection attempt
pub type AttemptId = u64;

/// Observable phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Connecting,
    AwaitingPassword,
    AwaitingPassphrase,
    AwaitingTrustConfirmation,
    Settling,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::AwaitingPassword => "awaiting_password",
            Phase::AwaitingPassphrase => "awaiting_passphrase",
            Phase::AwaitingTrustConfirmation => "awaiting_trust_confirmation",
            Phase::Settling => "settling",
        }
    }

    /// Whether the credential prompt should be shown
    pub fn needs_credential(&self) -> bool {
        matches!(self, Phase::AwaitingPassword | Phase::AwaitingPassphrase)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which secret a credential prompt asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SecretKind {
    Password,
    Passphrase,
}

impl SecretKind {
    pub(crate) fn prompt_stage(self) -> Stage {
        match self {
            SecretKind::Password => Stage::AwaitingPassword,
            SecretKind::Passphrase => Stage::AwaitingPassphrase,
        }
    }
}

/// Secrets supplied mid-attempt. Never persisted.
#[derive(Default)]
pub(crate) struct CachedSecrets {
    password: Option<Zeroizing<String>>,
    passphrase: Option<Zeroizing<String>>,
}

impl CachedSecrets {
    /// Write-once per kind; returns false if the slot was already filled
    pub(crate) fn store(&mut self, kind: SecretKind, secret: Zeroizing<String>) -> bool {
        let slot = match kind {
            SecretKind::Password => &mut self.password,
            SecretKind::Passphrase => &mut self.passphrase,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(secret);
        true
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.password.is_none() && self.passphrase.is_none()
    }

    /// Copy of the cached secrets for replay on a gateway call
    pub(crate) fn to_credentials(&self) -> Credentials {
        Credentials {
            password: self.password.clone(),
            passphrase: self.passphrase.clone(),
        }
    }
}

/// Internal stage. The pending host identity only exists inside
/// `AwaitingTrust`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Stage {
    Connecting,
    AwaitingPassword,
    AwaitingPassphrase,
    AwaitingTrust(HostIdentity),
    Settling,
}

impl Stage {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            Stage::Connecting => Phase::Connecting,
            Stage::AwaitingPassword => Phase::AwaitingPassword,
            Stage::AwaitingPassphrase => Phase::AwaitingPassphrase,
            Stage::AwaitingTrust(_) => Phase::AwaitingTrustConfirmation,
            Stage::Settling => Phase::Settling,
        }
    }
}

pub(crate) struct Attempt {
    pub(crate) id: AttemptId,
    pub(crate) profile: ConnectionProfile,
    pub(crate) stage: Stage,
    pub(crate) secrets: CachedSecrets,
}

impl Attempt {
    /// A credential was supplied by the user during this attempt
    pub(crate) fn credential_supplied(&self) -> bool {
        !self.secrets.is_empty()
    }

    pub(crate) fn phase(&self) -> Phase {
        self.stage.phase()
    }
}

#[derive(Default)]
pub struct AttemptState {
    last_id: AttemptId,
    current: Option<Attempt>,
}

impl AttemptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.current.as_ref().map_or(Phase::Idle, Attempt::phase)
    }

    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.current.as_ref().map(|a| a.id)
    }

    pub fn target_profile(&self) -> Option<&ConnectionProfile> {
        self.current.as_ref().map(|a| &a.profile)
    }

    pub fn pending_host_identity(&self) -> Option<&HostIdentity> {
        match self.current.as_ref().map(|a| &a.stage) {
            Some(Stage::AwaitingTrust(identity)) => Some(identity),
            _ => None,
        }
    }

    pub fn has_cached_secrets(&self) -> bool {
        self.current.as_ref().is_some_and(Attempt::credential_supplied)
    }

    /// Start a fresh attempt in `Connecting`, replacing any previous one
    pub(crate) fn begin(&mut self, profile: ConnectionProfile) -> AttemptId {
        self.last_id += 1;
        self.current = Some(Attempt {
            id: self.last_id,
            profile,
            stage: Stage::Connecting,
            secrets: CachedSecrets::default(),
        });
        self.last_id
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Attempt> {
        self.current.as_mut()
    }

    /// The current attempt, only if it is still `id`
    pub(crate) fn attempt_mut(&mut self, id: AttemptId) -> Option<&mut Attempt> {
        self.current.as_mut().filter(|a| a.id == id)
    }

    /// Terminal transition back to `Idle`
    pub(crate) fn reset(&mut self) -> Option<Attempt> {
        self.current.take()
    }
}
