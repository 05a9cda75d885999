//! Building resources from the manifest and tracked state

use super::Session;
use super::resource::{RemoteResource, TrackedResource};
use crate::manifest::Manifest;
use crate::state::StateEntry;
use anyhow::{Context, Result, bail};
use controlplane::entities::{
    Agent, Environment, Job, Policy, Project, Skill, Team, ToolSet, Worker, WorkerQueue,
};
use controlplane::{Desired, EntityKind, Observed};
use declarative::{BoxedResource, filter_by_target, overlay};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// Every manifest entry, plus a delete for each tracked address the
/// manifest no longer declares
pub fn manifest_resources(
    manifest: &Manifest,
    session: &Session,
    target: Option<&str>,
) -> Result<Vec<BoxedResource>> {
    let mut resources = Vec::with_capacity(manifest.len());
    push_table(&mut resources, &manifest.agent, session)?;
    push_table(&mut resources, &manifest.team, session)?;
    push_table(&mut resources, &manifest.project, session)?;
    push_table(&mut resources, &manifest.environment, session)?;
    push_table(&mut resources, &manifest.job, session)?;
    push_table(&mut resources, &manifest.policy, session)?;
    push_table(&mut resources, &manifest.skill, session)?;
    push_table(&mut resources, &manifest.toolset, session)?;
    push_table(&mut resources, &manifest.worker, session)?;
    push_table(&mut resources, &manifest.worker_queue, session)?;

    let state = session.snapshot();
    for (address, entry) in &state.resources {
        if !manifest.contains(address) {
            log::debug!("{address} is tracked but no longer declared");
            resources.push(Box::new(TrackedResource::new(
                address.as_str(),
                entry,
                session.clone(),
            )));
        }
    }

    Ok(filter_by_target(resources, target))
}

/// A delete for every tracked address in `target`
pub fn tracked_resources(session: &Session, target: Option<&str>) -> Vec<BoxedResource> {
    let state = session.snapshot();
    state
        .addresses(target)
        .into_iter()
        .filter_map(|address| {
            let entry = state.get(&address)?;
            let resource: BoxedResource =
                Box::new(TrackedResource::new(address.as_str(), entry, session.clone()));
            Some(resource)
        })
        .collect()
}

fn push_table<D: Desired>(
    resources: &mut Vec<BoxedResource>,
    table: &BTreeMap<String, D>,
    session: &Session,
) -> Result<()> {
    let kind = D::Observed::KIND;
    for (name, desired) in table {
        let address = format!("{kind}.{name}");
        let prior = prior::<D::Observed>(session, &address)?;
        resources.push(Box::new(RemoteResource::new(
            name.as_str(),
            desired.clone(),
            prior,
            session.clone(),
        )));
    }
    Ok(())
}

/// Last observed state for `address`, if tracked
fn prior<O: Observed>(session: &Session, address: &str) -> Result<Option<O>> {
    let state = session.lock();
    let Some(entry) = state.get(address) else {
        return Ok(None);
    };
    if entry.kind != O::KIND {
        bail!(
            "{address} is tracked as {} but declared as {}",
            entry.kind,
            O::KIND
        );
    }
    let observed = serde_json::from_value(entry.observed.clone())
        .with_context(|| format!("Tracked state for {address} is not a valid {}", O::KIND))?;
    Ok(Some(observed))
}

// ============================================================================
// Refresh
// ============================================================================

/// Outcome of a refresh
#[derive(Debug, Default)]
pub struct RefreshSummary {
    /// Addresses re-read successfully
    pub refreshed: Vec<String>,
    /// Addresses dropped because the resource went away on its own
    pub dropped: Vec<String>,
}

/// Re-read every tracked resource in `target`
///
/// Each response is merged over the prior observed state. Resources whose
/// absence is expected are dropped; any other failure aborts the refresh
/// with the state untouched.
pub fn refresh(session: &Session, target: Option<&str>, jobs: usize) -> Result<RefreshSummary> {
    let tracked: Vec<(String, StateEntry)> = {
        let state = session.lock();
        state
            .addresses(target)
            .into_iter()
            .filter_map(|address| state.get(&address).cloned().map(|e| (address, e)))
            .collect()
    };
    if tracked.is_empty() {
        return Ok(RefreshSummary::default());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create refresh thread pool")?;

    let reads: Vec<(String, StateEntry, controlplane::Result<Option<Value>>)> = pool.install(|| {
        tracked
            .into_par_iter()
            .map(|(address, entry)| {
                let read = session
                    .client()
                    .read_value(entry.kind, &entry.identity, session.opts());
                (address, entry, read)
            })
            .collect()
    });

    let mut summary = RefreshSummary::default();
    let mut updates = Vec::with_capacity(reads.len());
    for (address, entry, read) in reads {
        match read.with_context(|| format!("Failed to refresh {address}"))? {
            Some(record) => {
                let observed = overlay(&entry.observed, &record);
                updates.push((address, Some(StateEntry::new(entry.kind, entry.identity, observed))));
            }
            None => updates.push((address, None)),
        }
    }

    let mut state = session.lock();
    for (address, entry) in updates {
        match entry {
            Some(entry) => {
                state.upsert(&address, entry);
                summary.refreshed.push(address);
            }
            None => {
                log::info!("{address} is gone; no longer tracking it");
                state.remove(&address);
                summary.dropped.push(address);
            }
        }
    }
    Ok(summary)
}

// ============================================================================
// Import
// ============================================================================

/// Start tracking an existing resource at `kind.name`
pub fn import(session: &Session, kind: EntityKind, name: &str, identity: &str) -> Result<StateEntry> {
    let address = format!("{kind}.{name}");
    if session.lock().get(&address).is_some() {
        bail!("{address} is already tracked; remove it with `kcp state rm {address}` first");
    }

    let observed = match kind {
        EntityKind::Agent => import_as::<Agent>(session, identity),
        EntityKind::Team => import_as::<Team>(session, identity),
        EntityKind::Project => import_as::<Project>(session, identity),
        EntityKind::Environment => import_as::<Environment>(session, identity),
        EntityKind::Job => import_as::<Job>(session, identity),
        EntityKind::Policy => import_as::<Policy>(session, identity),
        EntityKind::Skill => import_as::<Skill>(session, identity),
        EntityKind::ToolSet => import_as::<ToolSet>(session, identity),
        EntityKind::Worker => import_as::<Worker>(session, identity),
        EntityKind::WorkerQueue => import_as::<WorkerQueue>(session, identity),
    }
    .with_context(|| format!("Failed to import {kind} {identity}"))?;

    let entry = StateEntry::new(kind, identity, observed);
    session.record(&address, entry.clone())?;
    Ok(entry)
}

fn import_as<O: Observed>(session: &Session, identity: &str) -> Result<Value> {
    let observed: O = session.client().import(identity, session.opts())?;
    Ok(serde_json::to_value(observed)?)
}
