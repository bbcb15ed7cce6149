//! Configuration types

use serde::{Deserialize, Serialize};

/// Current config file version
pub const CONFIG_VERSION: u32 = 1;

/// What to do when the server asks for trust again right after `confirm_trust`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrustPolicy {
    /// Any renewed trust request fails the attempt
    #[default]
    Fatal,
    /// A different key goes back to trust confirmation; the same key fails
    Reprompt,
}

/// Options of the negotiation controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationOptions {
    #[serde(default)]
    pub retrust_policy: RetrustPolicy,

    /// Prompt for the password before contacting the gateway when a password
    /// profile has no stored password
    #[serde(default = "default_true")]
    pub short_circuit_missing_password: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NegotiationOptions {
    fn default() -> Self {
        Self {
            retrust_policy: RetrustPolicy::Fatal,
            short_circuit_missing_password: true,
        }
    }
}

/// On-disk configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub version: u32,

    #[serde(default)]
    pub negotiation: NegotiationOptions,

    /// `tracing` filter directive, e.g. "ssh_negotiator=debug"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            negotiation: NegotiationOptions::default(),
            log_filter: None,
        }
    }
}
