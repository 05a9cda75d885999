//! Three-state fields for desired configuration
//!
//! A desired record is sparse: every field is either left out (no opinion),
//! explicitly cleared, or set to a value. A plain `Option<T>` cannot tell the
//! first two apart, so [`Field`] carries all three.
//!
//! ## Serde mapping
//!
//! | Input                     | Field             |
//! |---------------------------|-------------------|
//! | key missing               | `Field::Unset`    |
//! | `null`                    | `Field::Clear`    |
//! | any value                 | `Field::Value(v)` |
//!
//! Struct fields must carry `#[serde(default, skip_serializing_if = "Field::is_unset")]`
//! so that a missing key becomes `Unset` and `Unset` is never written out.
//! `Clear` serializes as the empty value of `T` (`""`, `0`, `[]`, `{}`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A desired-configuration field with explicit unset/clear/value states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Not declared; the remote value is left untouched
    #[default]
    Unset,
    /// Declared as empty; the remote value is reset to the empty value
    Clear,
    /// Declared with a value
    Value(T),
}

impl<T> Field<T> {
    /// Check if the field was left out of the desired configuration
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Borrow the declared value, if any
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as a `Field<&T>`
    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Self::Unset => Field::Unset,
            Self::Clear => Field::Clear,
            Self::Value(v) => Field::Value(v),
        }
    }

    /// Map the contained value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Self::Unset => Field::Unset,
            Self::Clear => Field::Clear,
            Self::Value(v) => Field::Value(f(v)),
        }
    }

    /// Replace `Unset` with a default value, leaving declared fields alone
    pub fn or_value(self, default: T) -> Self {
        match self {
            Self::Unset => Self::Value(default),
            other => other,
        }
    }
}

impl<T: Default + Clone> Field<T> {
    /// Resolve to the value that would be sent: `None` when unset,
    /// the empty value when cleared.
    pub fn resolve(&self) -> Option<T> {
        match self {
            Self::Unset => None,
            Self::Clear => Some(T::default()),
            Self::Value(v) => Some(v.clone()),
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Serialize + Default> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unset => serializer.serialize_none(),
            Self::Clear => T::default().serialize(serializer),
            Self::Value(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            None => Self::Clear,
            Some(v) => Self::Value(v),
        })
    }
}
