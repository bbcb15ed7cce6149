//! Negotiation events
//!
//! Every transition is pushed to an optional unbounded channel so a UI or a
//! test harness can follow the attempt without polling.

use serde::Serialize;

use super::error::NegotiationError;
use super::state::{AttemptId, Phase};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectEvent {
    PhaseChanged {
        attempt_id: AttemptId,
        phase: Phase,
    },
    Connected {
        attempt_id: AttemptId,
        profile_id: String,
        session_id: String,
    },
    Failed {
        attempt_id: AttemptId,
        profile_id: String,
        error: NegotiationError,
    },
    Cancelled {
        attempt_id: AttemptId,
        profile_id: String,
    },
    /// A gateway result arrived for an attempt that no longer exists
    StaleResultDiscarded { attempt_id: AttemptId },
}

/// Event names, for frontends that route on strings
pub mod event_names {
    pub const PHASE_CHANGED: &str = "negotiation:phase_changed";
    pub const CONNECTED: &str = "negotiation:connected";
    pub const FAILED: &str = "negotiation:failed";
    pub const CANCELLED: &str = "negotiation:cancelled";
    pub const STALE_RESULT_DISCARDED: &str = "negotiation:stale_result_discarded";
}

impl ConnectEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectEvent::PhaseChanged { .. } => event_names::PHASE_CHANGED,
            ConnectEvent::Connected { .. } => event_names::CONNECTED,
            ConnectEvent::Failed { .. } => event_names::FAILED,
            ConnectEvent::Cancelled { .. } => event_names::CANCELLED,
            ConnectEvent::StaleResultDiscarded { .. } => event_names::STALE_RESULT_DISCARDED,
        }
    }

    pub fn attempt_id(&self) -> AttemptId {
        match self {
            ConnectEvent::PhaseChanged { attempt_id, .. }
            | ConnectEvent::Connected { attempt_id, .. }
            | ConnectEvent::Failed { attempt_id, .. }
            | ConnectEvent::Cancelled { attempt_id, .. }
            | ConnectEvent::StaleResultDiscarded { attempt_id } => *attempt_id,
        }
    }
}
