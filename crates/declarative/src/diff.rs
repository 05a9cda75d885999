//! Field-level diff between desired configuration and observed state
//!
//! [`DeltaBuilder`] walks the updatable fields of a record one at a time and
//! collects only the ones whose declared value differs from what was last
//! observed. The result is a [`Delta`]: the partial-update body plus a
//! [`FieldChange`] per entry for display.
//!
//! Comparison rules per field shape:
//!
//! - [`DeltaBuilder::scalar`]: plain equality
//! - [`DeltaBuilder::tags`]: unordered content (sorted multiset)
//! - [`DeltaBuilder::list`]: ordered equality
//! - [`DeltaBuilder::blob`]: canonical JSON; the whole value is sent on change
//!
//! An observed value that is absent compares equal to the empty value,
//! because the remote API omits empty fields from its responses.

use crate::field::Field;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One changed field, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name as sent on the wire
    pub field: String,
    /// Last observed value (None when absent)
    pub before: Option<Value>,
    /// Value that will be sent
    pub after: Value,
}

/// A minimal partial-update payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    body: Map<String, Value>,
    changes: Vec<FieldChange>,
}

impl Delta {
    /// Create an empty delta
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if a field is part of the delta
    pub fn contains(&self, field: &str) -> bool {
        self.body.contains_key(field)
    }

    /// Value to be sent for a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Changed field names, in insertion order of the builder
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.field.as_str())
    }

    /// Per-field changes for display
    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    /// Drop fields for which the predicate returns false
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.body.retain(|k, _| keep(k));
        self.changes.retain(|c| keep(&c.field));
    }

    /// Remove a field, returning the value that would have been sent
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.changes.retain(|c| c.field != field);
        self.body.remove(field)
    }

    /// Borrow the request body
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Consume into a JSON object body
    pub fn into_body(self) -> Value {
        Value::Object(self.body)
    }

    fn push(&mut self, field: &str, before: Option<Value>, after: Value) {
        self.body.insert(field.to_string(), after.clone());
        self.changes.push(FieldChange {
            field: field.to_string(),
            before,
            after,
        });
    }
}

/// Builds a [`Delta`] field by field
///
/// # Example
///
/// ```
/// use declarative::{DeltaBuilder, Field};
///
/// let desired_name = Field::Value("svc-bot".to_string());
/// let desired_description = Field::Value("new".to_string());
/// let observed_description = Some("old".to_string());
///
/// let mut builder = DeltaBuilder::new();
/// builder
///     .scalar("name", &desired_name, Some(&"svc-bot".to_string()))
///     .scalar("description", &desired_description, observed_description.as_ref());
/// let delta = builder.finish().unwrap();
///
/// assert_eq!(delta.len(), 1);
/// assert_eq!(delta.get("description").unwrap(), "new");
/// ```
#[derive(Debug, Default)]
pub struct DeltaBuilder {
    delta: Delta,
    error: Option<serde_json::Error>,
}

impl DeltaBuilder {
    /// Start an empty delta
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a scalar field by equality
    pub fn scalar<T>(&mut self, name: &str, desired: &Field<T>, observed: Option<&T>) -> &mut Self
    where
        T: Serialize + PartialEq + Default + Clone,
    {
        let Some(want) = desired.resolve() else {
            return self;
        };
        let have = observed.cloned().unwrap_or_default();
        if want != have {
            self.record(name, observed, &want);
        }
        self
    }

    /// Compare a tag-like collection by unordered content
    pub fn tags(
        &mut self,
        name: &str,
        desired: &Field<Vec<String>>,
        observed: Option<&[String]>,
    ) -> &mut Self {
        let Some(want) = desired.resolve() else {
            return self;
        };
        let mut want_sorted = want.clone();
        want_sorted.sort();
        let mut have_sorted = observed.map(<[String]>::to_vec).unwrap_or_default();
        have_sorted.sort();
        if want_sorted != have_sorted {
            self.record(name, observed, &want);
        }
        self
    }

    /// Compare a semantically ordered list by ordered equality
    pub fn list<T>(&mut self, name: &str, desired: &Field<Vec<T>>, observed: Option<&[T]>) -> &mut Self
    where
        T: Serialize + PartialEq + Clone,
    {
        let Some(want) = desired.resolve() else {
            return self;
        };
        if want.as_slice() != observed.unwrap_or_default() {
            self.record(name, observed, &want);
        }
        self
    }

    /// Compare a structured sub-object as an opaque value
    ///
    /// Any difference after canonical JSON re-serialization puts the whole
    /// desired value into the delta.
    pub fn blob<T>(&mut self, name: &str, desired: &Field<T>, observed: Option<&T>) -> &mut Self
    where
        T: Serialize + Default + Clone,
    {
        let Some(want) = desired.resolve() else {
            return self;
        };
        let want_json = match serde_json::to_value(&want) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let have_json = match serde_json::to_value(observed.cloned().unwrap_or_default()) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        if canonical_json(&want_json) != canonical_json(&have_json) {
            self.record(name, observed, &want);
        }
        self
    }

    /// Finish the delta
    pub fn finish(self) -> serde_json::Result<Delta> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.delta),
        }
    }

    fn record<B: Serialize + ?Sized, A: Serialize>(
        &mut self,
        name: &str,
        before: Option<&B>,
        after: &A,
    ) {
        let before = match before.map(serde_json::to_value).transpose() {
            Ok(v) => v,
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        match serde_json::to_value(after) {
            Ok(after) => {
                log::trace!("field '{}' changed", name);
                self.delta.push(name, before, after);
            }
            Err(e) => {
                self.fail(e);
            }
        }
    }

    fn fail(&mut self, error: serde_json::Error) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }
}

/// Serialize a JSON value with object keys sorted at every level
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s(v: &str) -> String {
        v.to_string()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_unset_is_never_in_delta() {
        let mut b = DeltaBuilder::new();
        b.scalar("description", &Field::<String>::Unset, Some(&s("remote")))
            .tags("tags", &Field::Unset, Some(strings(&["a"]).as_slice()))
            .blob("settings", &Field::<Map<String, Value>>::Unset, None);
        assert!(b.finish().unwrap().is_empty());
    }

    #[test]
    fn test_equal_scalar_is_not_in_delta() {
        let mut b = DeltaBuilder::new();
        b.scalar("name", &Field::Value(s("svc-bot")), Some(&s("svc-bot")));
        assert!(b.finish().unwrap().is_empty());
    }

    #[test]
    fn test_changed_scalar_is_in_delta() {
        let mut b = DeltaBuilder::new();
        b.scalar("description", &Field::Value(s("new")), Some(&s("old")));
        let delta = b.finish().unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.get("description"), Some(&json!("new")));
        assert_eq!(delta.changes()[0].before, Some(json!("old")));
    }

    #[test]
    fn test_clear_produces_empty_value() {
        let mut b = DeltaBuilder::new();
        b.scalar("description", &Field::<String>::Clear, Some(&s("old")))
            .scalar("max_workers", &Field::<i64>::Clear, Some(&5))
            .tags("tags", &Field::Clear, Some(strings(&["x"]).as_slice()));
        let delta = b.finish().unwrap();
        assert_eq!(
            delta.into_body(),
            json!({"description": "", "max_workers": 0, "tags": []})
        );
    }

    #[test]
    fn test_clear_against_absent_is_no_change() {
        let mut b = DeltaBuilder::new();
        b.scalar("description", &Field::<String>::Clear, None);
        assert!(b.finish().unwrap().is_empty());
    }

    #[test]
    fn test_value_against_absent_is_change() {
        let mut b = DeltaBuilder::new();
        b.scalar("team_id", &Field::Value(s("t-1")), None);
        let delta = b.finish().unwrap();
        assert_eq!(delta.changes()[0].before, None);
        assert_eq!(delta.get("team_id"), Some(&json!("t-1")));
    }

    #[test]
    fn test_tags_compare_unordered() {
        let mut b = DeltaBuilder::new();
        b.tags("tags", &Field::Value(strings(&["b", "a"])), Some(strings(&["a", "b"]).as_slice()));
        assert!(b.finish().unwrap().is_empty());

        let mut b = DeltaBuilder::new();
        b.tags("tags", &Field::Value(strings(&["a", "a"])), Some(strings(&["a"]).as_slice()));
        assert_eq!(b.finish().unwrap().len(), 1);
    }

    #[test]
    fn test_list_compares_ordered() {
        let mut b = DeltaBuilder::new();
        b.list(
            "capabilities",
            &Field::Value(strings(&["b", "a"])),
            Some(strings(&["a", "b"]).as_slice()),
        );
        let delta = b.finish().unwrap();
        assert_eq!(delta.get("capabilities"), Some(&json!(["b", "a"])));
    }

    #[test]
    fn test_blob_ignores_key_order_and_sends_whole_object() {
        let mut observed = Map::new();
        observed.insert(s("a"), json!(1));
        observed.insert(s("b"), json!({"x": 1, "y": 2}));

        let mut same = Map::new();
        same.insert(s("b"), json!({"y": 2, "x": 1}));
        same.insert(s("a"), json!(1));

        let mut b = DeltaBuilder::new();
        b.blob("configuration", &Field::Value(same), Some(&observed));
        assert!(b.finish().unwrap().is_empty());

        let mut changed = observed.clone();
        changed.insert(s("a"), json!(2));
        let mut b = DeltaBuilder::new();
        b.blob("configuration", &Field::Value(changed), Some(&observed));
        let delta = b.finish().unwrap();
        assert_eq!(
            delta.get("configuration"),
            Some(&json!({"a": 2, "b": {"x": 1, "y": 2}}))
        );
    }

    #[test]
    fn test_retain_and_remove() {
        let mut b = DeltaBuilder::new();
        b.scalar("id", &Field::Value(s("x")), None)
            .scalar("name", &Field::Value(s("n")), None)
            .scalar("status", &Field::Value(s("active")), None);
        let mut delta = b.finish().unwrap();

        delta.retain(|f| f != "id");
        assert!(!delta.contains("id"));
        assert_eq!(delta.changes().len(), 2);

        assert_eq!(delta.remove("status"), Some(json!("active")));
        assert_eq!(delta.fields().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let a = json!({"b": [{"d": 1, "c": 2}], "a": null});
        assert_eq!(canonical_json(&a), r#"{"a":null,"b":[{"c":2,"d":1}]}"#);
    }
}
