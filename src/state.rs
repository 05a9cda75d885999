//! Tracked observed state
//!
//! One entry per resource address, holding the last observed record as
//! returned by the Control Plane. Stored as JSON because observed records
//! carry arbitrary blobs and explicit nulls.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use controlplane::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Everything kcp tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// Format version
    pub version: u32,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,

    /// Tracked resources by address (`kind.name`)
    #[serde(default)]
    pub resources: BTreeMap<String, StateEntry>,
}

/// One tracked resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub kind: EntityKind,
    pub identity: String,
    pub observed: Value,
    pub updated_at: DateTime<Utc>,
}

impl StateEntry {
    /// Create an entry observed just now
    pub fn new(kind: EntityKind, identity: impl Into<String>, observed: Value) -> Self {
        Self {
            kind,
            identity: identity.into(),
            observed,
            updated_at: Utc::now(),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

impl State {
    /// Load state from `path`, or an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            anyhow::bail!(
                "State file {} has version {}, this kcp understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!("Loaded {} tracked resources from {}", state.resources.len(), path.display());
        Ok(state)
    }

    /// Save state to `path` atomically
    ///
    /// Writes a temp file next to the target and renames it into place.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

        let content = serde_json::to_string_pretty(&self).context("Failed to serialize state")?;
        let tmp = temp_path(path);
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    // ========================================================================
    // Entry Helpers
    // ========================================================================

    /// Get a tracked entry
    pub fn get(&self, address: &str) -> Option<&StateEntry> {
        self.resources.get(address)
    }

    /// Track or replace an entry
    pub fn upsert(&mut self, address: &str, entry: StateEntry) {
        self.resources.insert(address.to_string(), entry);
    }

    /// Stop tracking an address
    pub fn remove(&mut self, address: &str) -> Option<StateEntry> {
        self.resources.remove(address)
    }

    /// Addresses matching a `kind` or `kind.name` target
    pub fn addresses(&self, target: Option<&str>) -> Vec<String> {
        self.resources
            .keys()
            .filter(|address| declarative::address_matches(address, target))
            .cloned()
            .collect()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================
