//! Connection Controller
//!
//! Drives one connection attempt at a time through the gateway and
//! suspends at the points where the user has to answer something.
//!
//! ```text
//!   Idle ──start_connect──▶ Connecting ──connect──┬─▶ Settling ──▶ Idle (session id)
//!                              ▲                  ├─▶ AwaitingTrustConfirmation
//!                              │                  ├─▶ AwaitingPassword / AwaitingPassphrase
//!                              │                  └─▶ Idle (failure)
//!       submit_credential ─────┤
//!       confirm_trust ─────────┘  (trust, then reconnect replaying cached secrets)
//!       reject_trust / cancel_connect ──▶ Idle
//! ```
//!
//! The state lock is never held across a gateway call. Each call is tagged
//! with the attempt it belongs to and its result is dropped if that attempt
//! has ended in the meantime.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use super::classify::classify;
use super::error::NegotiationError;
use super::events::ConnectEvent;
use super::state::{AttemptId, AttemptState, Phase, SecretKind, Stage};
use crate::config::{ConfigFile, NegotiationOptions, RetrustPolicy};
use crate::gateway::{
    ConnectOutcome, Credentials, Gateway, GatewayError, HostIdentity, SessionInfo,
};
use crate::profile::{AuthKind, ConnectionProfile};

/// Where an entry point left the attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStep {
    /// Attempt complete; the caller owns the session from here on
    Connected { session_id: String },
    AwaitingPassword,
    AwaitingPassphrase,
    /// The host identity must be confirmed or rejected
    AwaitingTrust(HostIdentity),
    /// The attempt ended while the gateway call was in flight; its result was dropped
    Discarded,
}

pub struct ConnectionController {
    gateway: Arc<dyn Gateway>,
    options: NegotiationOptions,
    state: Mutex<AttemptState>,
    event_tx: Option<mpsc::UnboundedSender<ConnectEvent>>,
}

impl ConnectionController {
    pub fn new(gateway: Arc<dyn Gateway>, options: NegotiationOptions) -> Self {
        Self {
            gateway,
            options,
            state: Mutex::new(AttemptState::new()),
            event_tx: None,
        }
    }

    /// Controller using the negotiation options of a loaded config file
    pub fn from_config(gateway: Arc<dyn Gateway>, config: &ConfigFile) -> Self {
        Self::new(gateway, config.negotiation.clone())
    }

    /// Set event sender for observing transitions
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<ConnectEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn options(&self) -> &NegotiationOptions {
        &self.options
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn phase(&self) -> Phase {
        self.state.lock().phase()
    }

    pub fn current_attempt_id(&self) -> Option<AttemptId> {
        self.state.lock().attempt_id()
    }

    pub fn target_profile(&self) -> Option<ConnectionProfile> {
        self.state.lock().target_profile().cloned()
    }

    /// Host identity to display in the trust prompt
    pub fn pending_host_identity(&self) -> Option<HostIdentity> {
        self.state.lock().pending_host_identity().cloned()
    }

    pub fn should_show_credential_prompt(&self) -> bool {
        self.phase().needs_credential()
    }

    pub fn should_show_trust_prompt(&self) -> bool {
        self.phase() == Phase::AwaitingTrustConfirmation
    }

    pub fn has_cached_secrets(&self) -> bool {
        self.state.lock().has_cached_secrets()
    }

    /// Session lookup for callers after a successful attempt
    pub async fn session_info(&self, session_id: &str) -> Result<Option<SessionInfo>, GatewayError> {
        self.gateway.get_session_info(session_id).await
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Begin a new attempt for `profile`
    pub async fn start_connect(
        &self,
        profile: ConnectionProfile,
    ) -> Result<ConnectStep, NegotiationError> {
        let profile_id = profile.id.clone();
        let short_circuit = self.options.short_circuit_missing_password
            && profile.auth == AuthKind::Password
            && !profile.has_stored_password();

        let attempt_id = {
            let mut state = self.state.lock();
            let phase = state.phase();
            if phase != Phase::Idle {
                warn!(
                    "Rejecting connect to {}: attempt already {}",
                    profile.display_name(),
                    phase
                );
                return Err(NegotiationError::Busy { phase });
            }
            info!(
                "Starting connection attempt for {} (profile {})",
                profile.display_name(),
                profile_id
            );
            let attempt_id = state.begin(profile);
            self.emit_phase(attempt_id, Phase::Connecting);

            if short_circuit {
                debug!("No stored password, prompting before contacting the gateway");
                if let Some(attempt) = state.attempt_mut(attempt_id) {
                    attempt.stage = Stage::AwaitingPassword;
                }
                self.emit_phase(attempt_id, Phase::AwaitingPassword);
                return Ok(ConnectStep::AwaitingPassword);
            }
            attempt_id
        };

        let result = self
            .gateway
            .connect(&profile_id, Credentials::none())
            .await;
        self.apply_outcome(attempt_id, result, None)
    }

    /// Answer the credential prompt and retry the connection with it
    pub async fn submit_credential(
        &self,
        secret: impl Into<String>,
    ) -> Result<ConnectStep, NegotiationError> {
        let secret = Zeroizing::new(secret.into());

        let (attempt_id, profile_id, credentials) = {
            let mut state = self.state.lock();
            let actual = state.phase();
            let Some(attempt) = state.current_mut() else {
                return Err(invalid("submit_credential", actual));
            };
            let kind = match attempt.stage {
                Stage::AwaitingPassword => SecretKind::Password,
                Stage::AwaitingPassphrase => SecretKind::Passphrase,
                _ => return Err(invalid("submit_credential", actual)),
            };
            if !attempt.secrets.store(kind, secret) {
                return Err(invalid("submit_credential", actual));
            }
            attempt.stage = Stage::Connecting;
            let attempt_id = attempt.id;
            let profile_id = attempt.profile.id.clone();
            let credentials = attempt.secrets.to_credentials();
            self.emit_phase(attempt_id, Phase::Connecting);
            (attempt_id, profile_id, credentials)
        };

        debug!("Retrying attempt {} with submitted credential", attempt_id);
        let result = self.gateway.connect(&profile_id, credentials).await;
        self.apply_outcome(attempt_id, result, None)
    }

    /// Trust the pending host identity, then reconnect replaying any
    /// credential cached earlier in this attempt
    pub async fn confirm_trust(&self) -> Result<ConnectStep, NegotiationError> {
        let (attempt_id, profile_id, identity) = {
            let mut state = self.state.lock();
            let actual = state.phase();
            let Some(attempt) = state.current_mut() else {
                return Err(invalid("confirm_trust", actual));
            };
            let identity = match std::mem::replace(&mut attempt.stage, Stage::Connecting) {
                Stage::AwaitingTrust(identity) => identity,
                other => {
                    attempt.stage = other;
                    return Err(invalid("confirm_trust", actual));
                }
            };
            let attempt_id = attempt.id;
            let profile_id = attempt.profile.id.clone();
            self.emit_phase(attempt_id, Phase::Connecting);
            (attempt_id, profile_id, identity)
        };

        info!(
            "Trusting host key for {}:{} ({} {})",
            identity.host, identity.port, identity.key_type, identity.fingerprint
        );
        if let Err(e) = self.gateway.trust_host_identity(&identity).await {
            return self.fail_if_current(attempt_id, NegotiationError::TrustFailed(e));
        }

        // Secrets are read from the attempt, not captured earlier, so an
        // attempt cancelled during the trust call replays nothing.
        let credentials = self
            .state
            .lock()
            .attempt_mut(attempt_id)
            .map(|attempt| attempt.secrets.to_credentials());
        let Some(credentials) = credentials else {
            return Ok(self.discard_stale(attempt_id));
        };

        let result = self
            .gateway
            .reconnect_after_trust(&profile_id, credentials)
            .await;
        self.apply_outcome(attempt_id, result, Some(&identity))
    }

    /// Decline the pending host identity. No gateway call is made.
    pub fn reject_trust(&self) -> Result<(), NegotiationError> {
        let mut state = self.state.lock();
        let actual = state.phase();
        if actual != Phase::AwaitingTrustConfirmation {
            return Err(invalid("reject_trust", actual));
        }

        if let Some(attempt) = state.reset() {
            warn!(
                "Host identity rejected for {} (attempt {})",
                attempt.profile.display_name(),
                attempt.id
            );
            self.emit_phase(attempt.id, Phase::Idle);
            self.emit(ConnectEvent::Failed {
                attempt_id: attempt.id,
                profile_id: attempt.profile.id,
                error: NegotiationError::HostIdentityRejected,
            });
        }
        Ok(())
    }

    /// Abandon the current attempt. An in-flight gateway call is not aborted;
    /// its result is dropped when it arrives.
    pub fn cancel_connect(&self) -> Result<(), NegotiationError> {
        let mut state = self.state.lock();
        let Some(attempt) = state.reset() else {
            return Err(invalid("cancel_connect", Phase::Idle));
        };

        info!(
            "Cancelled connection attempt {} for {} (was {})",
            attempt.id,
            attempt.profile.display_name(),
            attempt.phase()
        );
        self.emit_phase(attempt.id, Phase::Idle);
        self.emit(ConnectEvent::Cancelled {
            attempt_id: attempt.id,
            profile_id: attempt.profile.id,
        });
        Ok(())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Apply a `connect` / `reconnect_after_trust` result to attempt `attempt_id`.
    /// `trusted` is the identity confirmed just before, when reconnecting.
    fn apply_outcome(
        &self,
        attempt_id: AttemptId,
        result: Result<ConnectOutcome, GatewayError>,
        trusted: Option<&HostIdentity>,
    ) -> Result<ConnectStep, NegotiationError> {
        let mut state = self.state.lock();
        let Some(attempt) = state.attempt_mut(attempt_id) else {
            drop(state);
            return Ok(self.discard_stale(attempt_id));
        };

        match result {
            Ok(ConnectOutcome::Connected { session_id }) => {
                attempt.stage = Stage::Settling;
                self.emit_phase(attempt_id, Phase::Settling);

                if let Some(attempt) = state.reset() {
                    info!(
                        "Connected to {} (attempt {}, session {})",
                        attempt.profile.display_name(),
                        attempt_id,
                        session_id
                    );
                    self.emit_phase(attempt_id, Phase::Idle);
                    self.emit(ConnectEvent::Connected {
                        attempt_id,
                        profile_id: attempt.profile.id,
                        session_id: session_id.clone(),
                    });
                }
                Ok(ConnectStep::Connected { session_id })
            }
            Ok(ConnectOutcome::NeedsTrustConfirmation(identity)) => {
                if let Some(trusted) = trusted {
                    let reprompt = self.options.retrust_policy == RetrustPolicy::Reprompt
                        && !identity.same_key_as(trusted);
                    if !reprompt {
                        drop(state);
                        return self.fail_if_current(
                            attempt_id,
                            NegotiationError::RepeatedTrustRequest {
                                fingerprint: identity.fingerprint,
                            },
                        );
                    }
                }

                if identity.is_mismatch() {
                    warn!(
                        "Host key mismatch for {}:{}: presented {}",
                        identity.host, identity.port, identity.fingerprint
                    );
                } else {
                    info!(
                        "Unknown host key for {}:{} ({})",
                        identity.host, identity.port, identity.fingerprint
                    );
                }
                attempt.stage = Stage::AwaitingTrust(identity.clone());
                self.emit_phase(attempt_id, Phase::AwaitingTrustConfirmation);
                Ok(ConnectStep::AwaitingTrust(identity))
            }
            Err(e) => {
                let classification =
                    classify(&e, attempt.credential_supplied(), attempt.profile.auth);
                match classification.secret_kind() {
                    Some(kind) => {
                        debug!("Attempt {} needs a credential: {}", attempt_id, e);
                        attempt.stage = kind.prompt_stage();
                        let phase = attempt.phase();
                        self.emit_phase(attempt_id, phase);
                        Ok(match phase {
                            Phase::AwaitingPassphrase => ConnectStep::AwaitingPassphrase,
                            _ => ConnectStep::AwaitingPassword,
                        })
                    }
                    None => {
                        drop(state);
                        self.fail_if_current(attempt_id, NegotiationError::Gateway(e))
                    }
                }
            }
        }
    }

    /// Terminal failure of `attempt_id`, unless it already ended
    fn fail_if_current(
        &self,
        attempt_id: AttemptId,
        err: NegotiationError,
    ) -> Result<ConnectStep, NegotiationError> {
        let mut state = self.state.lock();
        if state.attempt_mut(attempt_id).is_none() {
            drop(state);
            return Ok(self.discard_stale(attempt_id));
        }

        if let Some(attempt) = state.reset() {
            error!(
                "Connection attempt {} for {} failed: {}",
                attempt_id,
                attempt.profile.display_name(),
                err
            );
            self.emit_phase(attempt_id, Phase::Idle);
            self.emit(ConnectEvent::Failed {
                attempt_id,
                profile_id: attempt.profile.id,
                error: err.clone(),
            });
        }
        Err(err)
    }

    fn discard_stale(&self, attempt_id: AttemptId) -> ConnectStep {
        warn!("Discarding gateway result for ended attempt {}", attempt_id);
        self.emit(ConnectEvent::StaleResultDiscarded { attempt_id });
        ConnectStep::Discarded
    }

    fn emit_phase(&self, attempt_id: AttemptId, phase: Phase) {
        debug!("Attempt {} -> {}", attempt_id, phase);
        self.emit(ConnectEvent::PhaseChanged { attempt_id, phase });
    }

    fn emit(&self, event: ConnectEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }
}

fn invalid(operation: &'static str, actual: Phase) -> NegotiationError {
    NegotiationError::InvalidPhase { operation, actual }
}
