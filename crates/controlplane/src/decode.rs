//! Response decoder.
//!
//! Turns a [`Response`] into a record or a classified error:
//!
//! - non-2xx is always [`Error::RemoteStatus`] with the raw, unredacted body
//! - a 2xx body is tried against the kind's [`Shape`]s in order; a shape only
//!   matches when it yields an object with a non-empty identity
//! - when every shape fails the kind's registry entry decides between
//!   [`Error::NotFound`] and [`Error::Decode`]
//!
//! The same logical read is served by several upstream code paths that
//! serialize differently, so the shape list is kept as data and tried in a
//! fixed order.

use crate::error::{Error, Result};
use crate::registry::{Exhausted, KindSpec};
use crate::transport::Response;
use serde_json::Value;

/// One accepted layout of a single-record response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// The record itself: `{"id": ...}`.
    Object,
    /// An array whose first element is the record: `[{"id": ...}]`.
    Array,
    /// A wrapper holding an array: `{"<key>": [{"id": ...}]}`.
    Wrapped(&'static str),
}

impl Shape {
    /// Try this shape against a parsed body.
    ///
    /// Returns the record only if it carries a non-empty identity.
    #[must_use]
    pub fn try_parse(&self, body: &Value, spec: &KindSpec) -> Option<Value> {
        let candidate = match self {
            Self::Object => body.as_object().map(|_| body),
            Self::Array => body.as_array().and_then(|items| items.first()),
            Self::Wrapped(key) => body
                .get(key)
                .and_then(Value::as_array)
                .and_then(|items| items.first()),
        }?;
        if candidate.is_object() && spec.identity_of(candidate).is_some() {
            Some(candidate.clone())
        } else {
            None
        }
    }
}

/// Fail with [`Error::RemoteStatus`] unless the status is 2xx.
pub fn check_status(response: &Response) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Error::RemoteStatus {
            status: response.status,
            body: response.text(),
        })
    }
}

/// Parse a 2xx body; `None` when it is empty or whitespace.
pub fn parse_body(response: &Response) -> Result<Option<Value>> {
    check_status(response)?;
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&response.body)
        .map(Some)
        .map_err(|e| Error::decode(format!("response is not JSON: {e}")))
}

/// Decode one record of `spec`'s kind.
///
/// `identity` names what was asked for, for error messages.
pub fn decode_record(response: &Response, spec: &KindSpec, identity: &str) -> Result<Value> {
    let body = parse_body(response)?;
    if let Some(body) = &body {
        for shape in spec.read_shapes {
            if let Some(record) = shape.try_parse(body, spec) {
                log::trace!("{} decoded with shape {:?}", spec.kind, shape);
                return Ok(record);
            }
        }
    }
    match spec.on_exhausted {
        Exhausted::NotFound => Err(Error::NotFound {
            kind: spec.kind,
            identity: identity.to_string(),
        }),
        Exhausted::Decode => Err(Error::decode(format!(
            "{} response matched no accepted shape",
            spec.kind
        ))),
    }
}

/// Decode the body of an update response.
///
/// Partial objects are accepted: the caller overlays them on the prior
/// record, so a missing identity is filled from there. Other layouts must
/// match one of the kind's shapes. `None` for an empty body.
pub fn decode_update(response: &Response, spec: &KindSpec) -> Result<Option<Value>> {
    let Some(body) = parse_body(response)? else {
        return Ok(None);
    };
    if body.is_object() {
        return Ok(Some(body));
    }
    spec.read_shapes
        .iter()
        .find_map(|shape| shape.try_parse(&body, spec))
        .map(Some)
        .ok_or_else(|| Error::decode(format!("{} update response is not a record", spec.kind)))
}

/// Decode a list: a bare array or a wrapper keyed by the kind's plural.
pub fn decode_list(response: &Response, spec: &KindSpec) -> Result<Vec<Value>> {
    let body = parse_body(response)?;
    match body {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Object(mut wrapper)) => match wrapper.remove(spec.plural) {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) => Ok(Vec::new()),
            _ => Err(Error::decode(format!(
                "{} list has no '{}' array",
                spec.kind, spec.plural
            ))),
        },
        Some(_) => Err(Error::decode(format!("{} list is not an array", spec.kind))),
    }
}

/// Accept any 2xx, ignoring the body. Used for DELETE.
pub fn expect_success(response: &Response) -> Result<()> {
    check_status(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EntityKind, spec};
    use serde_json::json;

    fn worker_body(body: &Value) -> Result<Value> {
        decode_record(
            &Response::json(200, body),
            spec(EntityKind::Worker),
            "w1",
        )
    }

    #[test]
    fn test_worker_shapes_decode_to_same_record() {
        let record = json!({"id": "w1", "environment_name": "prod", "status": "active"});

        let single = worker_body(&record).unwrap();
        let array = worker_body(&json!([record.clone()])).unwrap();
        let wrapped = worker_body(&json!({"workers": [record.clone()]})).unwrap();

        assert_eq!(single, record);
        assert_eq!(array, record);
        assert_eq!(wrapped, record);
    }

    #[test]
    fn test_worker_all_null_object_is_not_accepted() {
        let err = worker_body(&json!({"id": null, "worker_id": ""})).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_worker_empty_results_are_not_found() {
        assert!(worker_body(&json!([])).unwrap_err().is_not_found());
        assert!(worker_body(&json!({"workers": []})).unwrap_err().is_not_found());
    }

    #[test]
    fn test_other_kinds_exhaust_to_decode_error() {
        let err = decode_record(
            &Response::json(200, &json!([{"id": "a1"}])),
            spec(EntityKind::Agent),
            "a1",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_non_success_is_remote_status_with_raw_body() {
        let err = decode_record(
            &Response::new(422, r#"{"api_key":"sk-abcdef","detail":"bad"}"#),
            spec(EntityKind::Agent),
            "a1",
        )
        .unwrap_err();
        match err {
            Error::RemoteStatus { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("sk-abcdef"));
            }
            other => panic!("Expected RemoteStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = decode_record(
            &Response::new(200, "<html>"),
            spec(EntityKind::Team),
            "t1",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_empty_body_success() {
        assert!(expect_success(&Response::empty(204)).is_ok());
        assert!(parse_body(&Response::new(200, "  \n")).unwrap().is_none());
        assert!(expect_success(&Response::empty(404)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_response_may_omit_identity() {
        let projects = spec(EntityKind::Project);
        let partial = decode_update(&Response::json(200, &json!({"name": "core-2"})), projects);
        assert_eq!(partial.unwrap(), Some(json!({"name": "core-2"})));
        assert_eq!(decode_update(&Response::empty(204), projects).unwrap(), None);
        assert!(matches!(
            decode_update(&Response::json(200, &json!("ok")), projects).unwrap_err(),
            Error::Decode { .. }
        ));
    }

    #[test]
    fn test_decode_list_shapes() {
        let agents = spec(EntityKind::Agent);
        let bare = decode_list(&Response::json(200, &json!([{"id": "a1"}])), agents).unwrap();
        let wrapped =
            decode_list(&Response::json(200, &json!({"agents": [{"id": "a1"}]})), agents).unwrap();
        assert_eq!(bare, wrapped);
        assert!(decode_list(&Response::json(200, &json!({"other": []})), agents).is_err());
        assert!(decode_list(&Response::empty(200), agents).unwrap().is_empty());
    }
}
