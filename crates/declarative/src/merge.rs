//! Merge a remote response back into previously observed state
//!
//! The response is authoritative for every top-level field it returns
//! (including an explicit `null`). Fields the response leaves out keep
//! their prior observed values.

use serde_json::{Map, Value};

/// Overlay the top-level fields of `response` onto `prior`
///
/// A non-object response carries no fields and leaves `prior` unchanged.
pub fn overlay(prior: &Value, response: &Value) -> Value {
    let mut merged = match prior {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Value::Object(fields) = response {
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}
