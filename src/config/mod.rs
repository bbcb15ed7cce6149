//! Configuration Management Module
//!
//! Negotiation options and logging settings, persisted as JSON.

pub mod storage;
pub mod types;

pub use storage::{config_dir, ConfigStorage, StorageError};
pub use types::{ConfigFile, NegotiationOptions, RetrustPolicy, CONFIG_VERSION};
