//! Reconciliation engine for kcp
//!
//! The engine orchestrates:
//! 1. Refreshing - Re-read tracked resources from the Control Plane
//! 2. Planning - Pair every manifest entry and tracked address with a change
//! 3. Executing - Apply changes in parallel and persist observed state

pub mod differ;
pub mod executor;
pub mod planner;
pub mod resource;

pub use executor::{ApplyOptions, apply};
pub use planner::{import, manifest_resources, refresh, tracked_resources};

use crate::state::{State, StateEntry};
use anyhow::{Context, Result};
use controlplane::{CallOptions, Client};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything a resource needs to talk to the Control Plane and record
/// what it observed
#[derive(Clone)]
pub struct Session {
    client: Arc<Client>,
    state: Arc<Mutex<State>>,
    state_path: PathBuf,
    opts: CallOptions,
}

impl Session {
    pub fn new(client: Client, state: State, state_path: impl Into<PathBuf>) -> Self {
        Self {
            client: Arc::new(client),
            state: Arc::new(Mutex::new(state)),
            state_path: state_path.into(),
            opts: CallOptions::new(),
        }
    }

    /// Use `opts` for every call made through this session
    pub fn with_options(mut self, opts: CallOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn opts(&self) -> &CallOptions {
        &self.opts
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Lock the tracked state, recovering from a poisoned lock
    pub fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Snapshot of the tracked state
    pub fn snapshot(&self) -> State {
        self.lock().clone()
    }

    /// Track `entry` at `address` and persist immediately
    pub fn record(&self, address: &str, entry: StateEntry) -> Result<()> {
        let mut state = self.lock();
        state.upsert(address, entry);
        state
            .save(&self.state_path)
            .with_context(|| format!("Failed to record {address}"))
    }

    /// Stop tracking `address` and persist immediately
    pub fn forget(&self, address: &str) -> Result<()> {
        let mut state = self.lock();
        state.remove(address);
        state
            .save(&self.state_path)
            .with_context(|| format!("Failed to forget {address}"))
    }

    /// Persist the tracked state as it is
    pub fn save(&self) -> Result<()> {
        self.lock().save(&self.state_path)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state_path", &self.state_path)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}
