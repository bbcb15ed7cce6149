//! Test utilities: a scripted gateway that records every call.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

use crate::gateway::{
    ConnectOutcome, Credentials, Gateway, GatewayError, HostIdentity, SessionInfo,
};

/// A recorded gateway call, with secrets in plain text for assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect {
        profile_id: String,
        password: Option<String>,
        passphrase: Option<String>,
    },
    Trust {
        fingerprint: String,
    },
    ReconnectAfterTrust {
        profile_id: String,
        password: Option<String>,
        passphrase: Option<String>,
    },
    SessionInfo {
        session_id: String,
    },
}

impl Call {
    pub fn password(&self) -> Option<&str> {
        match self {
            Call::Connect { password, .. } | Call::ReconnectAfterTrust { password, .. } => {
                password.as_deref()
            }
            _ => None,
        }
    }

    pub fn passphrase(&self) -> Option<&str> {
        match self {
            Call::Connect { passphrase, .. } | Call::ReconnectAfterTrust { passphrase, .. } => {
                passphrase.as_deref()
            }
            _ => None,
        }
    }
}

type Outcome = Result<ConnectOutcome, GatewayError>;

#[derive(Default)]
pub struct ScriptedGateway {
    connect_results: Mutex<VecDeque<Outcome>>,
    reconnect_results: Mutex<VecDeque<Outcome>>,
    trust_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    sessions: Mutex<HashMap<String, SessionInfo>>,
    calls: Mutex<Vec<Call>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    entered: Notify,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(self, result: Outcome) -> Self {
        self.connect_results.lock().push_back(result);
        self
    }

    pub fn on_reconnect(self, result: Outcome) -> Self {
        self.reconnect_results.lock().push_back(result);
        self
    }

    pub fn on_trust(self, result: Result<(), GatewayError>) -> Self {
        self.trust_results.lock().push_back(result);
        self
    }

    pub fn with_session(self, info: SessionInfo) -> Self {
        self.sessions.lock().insert(info.session_id.clone(), info);
        self
    }

    /// Hold the next gateway call open until the returned sender fires
    pub fn hold_next_call(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock() = Some(rx);
        tx
    }

    /// Wait until at least `count` gateway calls have been entered
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.entered.notified();
            if self.call_count() >= count {
                return;
            }
            notified.await;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn enter(&self, call: Call) {
        self.calls.lock().push(call);
        self.entered.notify_one();
        let gate = self.gate.lock().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }
}

pub fn connected(session_id: &str) -> Outcome {
    Ok(ConnectOutcome::Connected {
        session_id: session_id.to_string(),
    })
}

pub fn needs_trust(identity: HostIdentity) -> Outcome {
    Ok(ConnectOutcome::NeedsTrustConfirmation(identity))
}

pub fn unknown_host(fingerprint: &str) -> HostIdentity {
    HostIdentity::unknown("example.com", 22, "ssh-ed25519", fingerprint)
}

pub fn session_info(session_id: &str, profile_id: &str) -> SessionInfo {
    SessionInfo {
        session_id: session_id.to_string(),
        profile_id: profile_id.to_string(),
        host: "example.com".to_string(),
        port: 22,
        username: "alice".to_string(),
        connected_at: Utc::now(),
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn connect(
        &self,
        profile_id: &str,
        credentials: Credentials,
    ) -> Result<ConnectOutcome, GatewayError> {
        self.enter(Call::Connect {
            profile_id: profile_id.to_string(),
            password: credentials.password_str().map(str::to_string),
            passphrase: credentials.passphrase_str().map(str::to_string),
        })
        .await;
        self.connect_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Other("unscripted connect".into())))
    }

    async fn trust_host_identity(&self, identity: &HostIdentity) -> Result<(), GatewayError> {
        self.enter(Call::Trust {
            fingerprint: identity.fingerprint.clone(),
        })
        .await;
        self.trust_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn reconnect_after_trust(
        &self,
        profile_id: &str,
        credentials: Credentials,
    ) -> Result<ConnectOutcome, GatewayError> {
        self.enter(Call::ReconnectAfterTrust {
            profile_id: profile_id.to_string(),
            password: credentials.password_str().map(str::to_string),
            passphrase: credentials.passphrase_str().map(str::to_string),
        })
        .await;
        self.reconnect_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Other("unscripted reconnect".into())))
    }

    async fn get_session_info(&self, session_id: &str) -> Result<Option<SessionInfo>, GatewayError> {
        self.calls.lock().push(Call::SessionInfo {
            session_id: session_id.to_string(),
        });
        Ok(self.sessions.lock().get(session_id).cloned())
    }
}
