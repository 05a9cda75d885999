//! Generic resource reconciler.
//!
//! Create, read, update and delete for every entity kind, driven by the
//! registry instead of per-kind code. Each operation makes at most one
//! HTTP round trip and never retries.
//!
//! Update is where the interesting rules live:
//!
//! - the delta is computed against the last observed state; unset fields
//!   never take part and computed fields are stripped
//! - an empty delta returns the observed state without any request
//! - fields that cannot change in place fail with
//!   [`Error::RequiresReplacement`] before anything is sent
//! - the response is merged over the prior state plus the delta, so
//!   fields the server leaves out keep their values
//! - the merged identity must equal the prior identity

use crate::Client;
use crate::decode;
use crate::entity::{Desired, Observed};
use crate::error::{Error, Result};
use crate::registry::{EntityKind, KindSpec, Missing};
use crate::transport::{CallOptions, CancelToken, Method, Request, Response};
use declarative::{Delta, overlay};
use serde_json::{Map, Value};

/// Changed fields of `desired` against `observed`, without computed fields.
pub fn delta<D: Desired>(desired: &D, observed: &D::Observed) -> Result<Delta> {
    let spec = D::Observed::spec();
    let mut delta = desired.diff(observed)?;
    delta.retain(|field| !spec.is_computed(field));
    Ok(delta)
}

/// Fields in `delta` that force a replacement.
#[must_use]
pub fn replacement_fields(spec: &KindSpec, delta: &Delta) -> Vec<String> {
    delta
        .fields()
        .filter(|field| spec.requires_replace(field))
        .map(str::to_string)
        .collect()
}

/// Full create payload for `desired`.
///
/// Set fields are sent as-is, cleared fields as their empty value, unset
/// fields are left out unless the kind has a default for them. Computed
/// fields and the parent scope never appear.
pub fn create_body<D: Desired>(desired: &D) -> Result<Map<String, Value>> {
    let spec = D::Observed::spec();
    let mut body = match serde_json::to_value(desired)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (field, default) in spec.defaults {
        body.entry(*field).or_insert_with(|| default.to_json());
    }
    body.retain(|field, _| !spec.is_computed(field) && !spec.is_scope(field));
    Ok(body)
}

/// Fail unless `actual` is the identity the caller started from.
pub(crate) fn assert_identity(kind: EntityKind, expected: &str, actual: Option<String>) -> Result<()> {
    match actual {
        None => Err(Error::MissingIdentity { kind }),
        Some(actual) if actual != expected => Err(Error::IdentityChanged {
            kind,
            before: expected.to_string(),
            after: actual,
        }),
        Some(_) => Ok(()),
    }
}

fn missing_scope(spec: &KindSpec) -> Error {
    Error::MissingScope {
        kind: spec.kind,
        field: spec.scope.unwrap_or("scope"),
    }
}

impl Client {
    /// Send one request, honouring its cancellation token and deadline.
    ///
    /// Cancellation only stops a request that has not been sent. A response
    /// that arrives after the token flips is still returned, since the remote
    /// side has already acted on it.
    pub(crate) fn send(&self, request: Request) -> Result<Response> {
        request.options.check()?;
        log::trace!("{} {}", request.method, request.path);
        let response = self.transport.send(&request)?;
        if request
            .options
            .cancel
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
        {
            log::debug!(
                "{} {} completed after cancellation; keeping the response",
                request.method,
                request.path
            );
        }
        Ok(response)
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Create the resource described by `desired`.
    ///
    /// The observed state is seeded from the create payload and overlaid
    /// with the response. Nothing is kept on failure.
    pub fn create<D: Desired>(&self, desired: &D, opts: &CallOptions) -> Result<D::Observed> {
        let spec = D::Observed::spec();
        let path = spec
            .create
            .resolve(desired.scope())
            .ok_or_else(|| missing_scope(spec))?;
        let body = create_body(desired)?;
        log::info!("Creating {}", spec.kind);

        let response = self.send(
            Request::new(Method::Post, path)
                .body(Value::Object(body.clone()))
                .options(opts),
        )?;
        let record = decode::decode_record(&response, spec, "(new)")?;

        let mut seed = body;
        if let (Some(field), Some(scope)) = (spec.scope, desired.scope()) {
            seed.insert(field.to_string(), Value::from(scope));
        }
        let observed: D::Observed = serde_json::from_value(overlay(&Value::Object(seed), &record))?;
        let identity = observed
            .identity()
            .ok_or(Error::MissingIdentity { kind: spec.kind })?;
        log::info!("Created {} {}", spec.kind, identity);
        Ok(observed)
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Fetch one record without touching any tracked state.
    pub fn lookup(&self, kind: EntityKind, identity: &str, opts: &CallOptions) -> Result<Value> {
        let spec = kind.spec();
        let response = self.send(Request::new(Method::Get, spec.item_path(identity)).options(opts))?;
        decode::decode_record(&response, spec, identity)
    }

    /// Re-read a tracked record.
    ///
    /// `None` means the resource went away on its own and should no longer
    /// be tracked. That only happens for kinds whose absence is expected;
    /// for every other kind absence is [`Error::NotFound`].
    pub fn read_value(
        &self,
        kind: EntityKind,
        identity: &str,
        opts: &CallOptions,
    ) -> Result<Option<Value>> {
        match self.lookup(kind, identity, opts) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => match kind.spec().missing {
                Missing::Forget => {
                    log::info!("{} {} no longer exists", kind, identity);
                    Ok(None)
                }
                Missing::Fail => Err(Error::NotFound {
                    kind,
                    identity: identity.to_string(),
                }),
            },
            Err(e) => Err(e),
        }
    }

    /// Typed [`Client::read_value`].
    pub fn read<O: Observed>(&self, identity: &str, opts: &CallOptions) -> Result<Option<O>> {
        self.read_value(O::KIND, identity, opts)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Error::from)
    }

    /// Start tracking an existing resource from its identity alone.
    pub fn import<O: Observed>(&self, identity: &str, opts: &CallOptions) -> Result<O> {
        let record = self.lookup(O::KIND, identity, opts).map_err(|e| {
            if e.is_not_found() {
                Error::NotFound {
                    kind: O::KIND,
                    identity: identity.to_string(),
                }
            } else {
                e
            }
        })?;
        Ok(serde_json::from_value(record)?)
    }

    /// List remote records of a kind. Scoped kinds need `scope`.
    pub fn list_values(
        &self,
        kind: EntityKind,
        scope: Option<&str>,
        opts: &CallOptions,
    ) -> Result<Vec<Value>> {
        let spec = kind.spec();
        let path = spec.list.resolve(scope).ok_or_else(|| missing_scope(spec))?;
        let response = self.send(Request::new(Method::Get, path).options(opts))?;
        decode::decode_list(&response, spec)
    }

    /// Typed [`Client::list_values`].
    pub fn list<O: Observed>(&self, scope: Option<&str>, opts: &CallOptions) -> Result<Vec<O>> {
        self.list_values(O::KIND, scope, opts)?
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(Error::from))
            .collect()
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Bring `observed` in line with `desired`.
    pub fn update<D: Desired>(
        &self,
        desired: &D,
        observed: &D::Observed,
        opts: &CallOptions,
    ) -> Result<D::Observed> {
        let spec = D::Observed::spec();
        let identity = observed
            .identity()
            .ok_or(Error::MissingIdentity { kind: spec.kind })?;

        let delta = delta(desired, observed)?;
        if delta.is_empty() {
            log::debug!("{} {} is up to date", spec.kind, identity);
            return Ok(observed.clone());
        }
        let fields = replacement_fields(spec, &delta);
        if !fields.is_empty() {
            return Err(Error::RequiresReplacement {
                kind: spec.kind,
                fields,
            });
        }

        let prior = overlay(&serde_json::to_value(observed)?, &delta.clone().into_body());
        let merged = match spec.update.method() {
            None => {
                log::debug!("{} has no update endpoint; recording locally", spec.kind);
                prior
            }
            Some(method) => {
                log::info!(
                    "Updating {} {} ({})",
                    spec.kind,
                    identity,
                    delta.fields().collect::<Vec<_>>().join(", ")
                );
                let response = self.send(
                    Request::new(method, spec.item_path(&identity))
                        .body(delta.into_body())
                        .options(opts),
                )?;
                match decode::decode_update(&response, spec)? {
                    None => prior,
                    Some(fields) => overlay(&prior, &fields),
                }
            }
        };

        let updated: D::Observed = serde_json::from_value(merged)?;
        assert_identity(spec.kind, &identity, updated.identity())?;
        Ok(updated)
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete a resource.
    ///
    /// Kinds without a delete endpoint succeed without a request; they go
    /// away through their own lifecycle.
    pub fn delete(&self, kind: EntityKind, identity: &str, opts: &CallOptions) -> Result<()> {
        let spec = kind.spec();
        if !spec.deletable {
            log::debug!("{} {} cannot be deleted remotely; forgetting it", kind, identity);
            return Ok(());
        }
        log::info!("Deleting {} {}", kind, identity);
        let response =
            self.send(Request::new(Method::Delete, spec.item_path(identity)).options(opts))?;
        decode::expect_success(&response).map_err(|e| {
            if e.is_not_found() {
                Error::NotFound {
                    kind,
                    identity: identity.to_string(),
                }
            } else {
                e
            }
        })
    }
}
