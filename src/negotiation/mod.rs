//! Connection Negotiation Module
//!
//! Turns a saved profile into an authenticated, trusted session:
//! - Single attempt at a time, modelled as one tagged state value
//! - Credential prompts (password / key passphrase) as resumable steps
//! - Trust-on-first-use and host key mismatch confirmation
//! - Attempt-scoped secret cache, replayed after trust, wiped on every exit
//! - Cooperative cancellation with stale gateway results dropped

pub mod classify;
mod controller;
mod error;
pub mod events;
mod state;

pub use classify::{classify, Classification};
pub use controller::{ConnectStep, ConnectionController};
pub use error::NegotiationError;
pub use events::{event_names, ConnectEvent};
pub use state::{AttemptId, AttemptState, Phase};
