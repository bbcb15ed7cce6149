//! Known hosts management for trust-on-first-use
//!
//! Stores trusted host key fingerprints, one `host key_type fingerprint`
//! entry per line. Only fingerprints are compared here; key exchange and
//! signature checks belong to the transport.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD_NO_PAD as BASE64, Engine};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::error::GatewayError;
use crate::config::config_dir;
use super::types::HostIdentity;

#[derive(Debug, thiserror::Error)]
pub enum KnownHostsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<KnownHostsError> for GatewayError {
    fn from(err: KnownHostsError) -> Self {
        match err {
            KnownHostsError::Io(e) => GatewayError::Io(e.to_string()),
        }
    }
}

/// Result of host key verification
#[derive(Debug, Clone, PartialEq)]
pub enum HostKeyVerification {
    /// Fingerprint matches the trusted entry
    Verified,
    /// No trusted entry for this host and key type (first connection)
    Unknown,
    /// Fingerprint changed from the trusted entry (potential MITM)
    Changed { expected_fingerprint: String },
}

#[derive(Clone, Debug)]
struct HostKeyEntry {
    key_type: String,
    fingerprint: String,
}

pub struct KnownHostsStore {
    /// host pattern -> trusted keys (one per key type)
    hosts: RwLock<HashMap<String, Vec<HostKeyEntry>>>,
    path: PathBuf,
}

impl Default for KnownHostsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KnownHostsStore {
    /// Create a store backed by the default location
    pub fn new() -> Self {
        let path = config_dir()
            .map(|dir| dir.join("known_hosts"))
            .unwrap_or_else(|_| PathBuf::from(".ssh-negotiator/known_hosts"));

        let store = Self::empty(path);
        if let Err(e) = store.load() {
            warn!("Failed to load known hosts: {}", e);
        }
        store
    }

    /// Create with custom path (for testing)
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let store = Self::empty(path.into());
        if let Err(e) = store.load() {
            debug!("Known hosts file not readable: {}", e);
        }
        store
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<(), KnownHostsError> {
        if !self.path.exists() {
            return Ok(());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut hosts = self.hosts.write();
        let mut entry_count = 0;

        for line in reader.lines() {
            let line = line?;
            let Some((patterns, entry)) = Self::parse_line(&line) else {
                continue;
            };

            for pattern in patterns.split(',') {
                hosts
                    .entry(Self::normalize_pattern(pattern))
                    .or_default()
                    .push(entry.clone());
                entry_count += 1;
            }
        }

        info!(
            "Loaded {} known host entries ({} unique hosts)",
            entry_count,
            hosts.len()
        );
        Ok(())
    }

    /// Parse `patterns key_type fingerprint`; comments and blanks yield None
    fn parse_line(line: &str) -> Option<(&str, HostKeyEntry)> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut parts = line.split_whitespace();
        let patterns = parts.next()?;
        let key_type = parts.next()?;
        let fingerprint = parts.next()?;

        Some((
            patterns,
            HostKeyEntry {
                key_type: key_type.to_string(),
                fingerprint: fingerprint.to_string(),
            },
        ))
    }

    /// Normalize a stored pattern: lowercase, and `[host]:22` collapses to `host`
    fn normalize_pattern(pattern: &str) -> String {
        let pattern = pattern.to_lowercase();
        if let Some(rest) = pattern.strip_prefix('[') {
            if let Some((host, port)) = rest.split_once("]:") {
                if let Ok(port) = port.parse::<u16>() {
                    return Self::make_key(host, port);
                }
            }
            return rest.trim_end_matches(']').to_string();
        }
        pattern
    }

    /// Create lookup key for host:port
    fn make_key(host: &str, port: u16) -> String {
        let host = host.to_lowercase();
        if port == 22 {
            host
        } else {
            format!("[{}]:{}", host, port)
        }
    }

    /// Compute the SHA256 fingerprint of a raw public key blob
    pub fn fingerprint(public_key_bytes: &[u8]) -> String {
        let hash = Sha256::digest(public_key_bytes);
        format!("SHA256:{}", BASE64.encode(hash))
    }

    /// Check a presented fingerprint against the trusted entries
    pub fn verify(
        &self,
        host: &str,
        port: u16,
        key_type: &str,
        fingerprint: &str,
    ) -> HostKeyVerification {
        let lookup_key = Self::make_key(host, port);
        let hosts = self.hosts.read();

        let Some(entry) = hosts
            .get(&lookup_key)
            .and_then(|entries| entries.iter().find(|e| e.key_type == key_type))
        else {
            debug!("Unknown host key: {} ({})", lookup_key, key_type);
            return HostKeyVerification::Unknown;
        };

        if entry.fingerprint == fingerprint {
            debug!("Host key verified for {} ({})", lookup_key, key_type);
            HostKeyVerification::Verified
        } else {
            warn!(
                "HOST KEY CHANGED for {} ({})! Expected {}, got {}",
                lookup_key, key_type, entry.fingerprint, fingerprint
            );
            HostKeyVerification::Changed {
                expected_fingerprint: entry.fingerprint.clone(),
            }
        }
    }

    /// Build the identity to surface for confirmation, or None if already trusted
    pub fn identify(
        &self,
        host: &str,
        port: u16,
        key_type: &str,
        fingerprint: &str,
    ) -> Option<HostIdentity> {
        match self.verify(host, port, key_type, fingerprint) {
            HostKeyVerification::Verified => None,
            HostKeyVerification::Unknown => {
                Some(HostIdentity::unknown(host, port, key_type, fingerprint))
            }
            HostKeyVerification::Changed {
                expected_fingerprint,
            } => Some(HostIdentity::changed(
                host,
                port,
                key_type,
                fingerprint,
                expected_fingerprint,
            )),
        }
    }

    /// Trust a host identity. Trusting an already trusted key is a no-op.
    ///
    /// The file is replaced first; the in-memory view only changes once the
    /// new entry is on disk.
    pub fn trust(&self, identity: &HostIdentity) -> Result<(), KnownHostsError> {
        let lookup_key = Self::make_key(&identity.host, identity.port);

        let verification = self.verify(
            &identity.host,
            identity.port,
            &identity.key_type,
            &identity.fingerprint,
        );
        if verification == HostKeyVerification::Verified {
            return Ok(());
        }

        let mut content = self.read_without(&lookup_key, Some(&identity.key_type))?;
        content.push_str(&format!(
            "{} {} {}\n",
            lookup_key, identity.key_type, identity.fingerprint
        ));
        self.write_atomic(&content)?;

        {
            let mut hosts = self.hosts.write();
            let entries = hosts.entry(lookup_key.clone()).or_default();
            entries.retain(|e| e.key_type != identity.key_type);
            entries.push(HostKeyEntry {
                key_type: identity.key_type.clone(),
                fingerprint: identity.fingerprint.clone(),
            });
        }

        if let HostKeyVerification::Changed { expected_fingerprint } = verification {
            warn!(
                "Replaced host key for {} ({}): {} -> {}",
                lookup_key, identity.key_type, expected_fingerprint, identity.fingerprint
            );
        } else {
            info!(
                "Trusted host key for {} ({}, {})",
                lookup_key, identity.key_type, identity.fingerprint
            );
        }
        Ok(())
    }

    /// Remove every trusted key of a host (for key rotation)
    pub fn remove_host(&self, host: &str, port: u16) -> Result<(), KnownHostsError> {
        let lookup_key = Self::make_key(host, port);

        let content = self.read_without(&lookup_key, None)?;
        self.write_atomic(&content)?;
        self.hosts.write().remove(&lookup_key);

        info!("Removed host keys for {}", lookup_key);
        Ok(())
    }

    /// File contents without the entries for `host` (optionally of one key type).
    /// Comments and unrelated hosts are kept as they are.
    fn read_without(&self, host: &str, key_type: Option<&str>) -> Result<String, KnownHostsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut kept = String::with_capacity(content.len());
        for line in content.lines() {
            let drop_line = Self::parse_line(line).is_some_and(|(patterns, entry)| {
                patterns.split(',').any(|p| Self::normalize_pattern(p) == host)
                    && key_type.map_or(true, |t| entry.key_type == t)
            });
            if !drop_line {
                kept.push_str(line);
                kept.push('\n');
            }
        }
        Ok(kept)
    }

    /// Replace the file in one step (temp file + rename)
    fn write_atomic(&self, content: &str) -> Result<(), KnownHostsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
