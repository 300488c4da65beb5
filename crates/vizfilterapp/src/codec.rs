//! Value keys for session memory.
//!
//! A [`ValueKey`] is a storage-type-tagged comparison key derived from a
//! [`Value`]. Keys are only used to recognise values the user picked before
//! and to de-duplicate values within one load; rule building never looks at
//! them.
//!
//! Composite values collapse into a single text key:
//!
//! ```text
//! composite::<first>||<second>
//! ```
//!
//! Decoding fails closed: a key that does not split into exactly two fields
//! matches nothing.
//!
//! Real keys compare within the same `real_epsilon` the rule builder uses;
//! callers pass it in from [`EngineConfig`](crate::config::EngineConfig).

use serde::{Deserialize, Serialize};

use crate::model::{ElementId, StorageType, Value, ValuePayload};

pub const COMPOSITE_PREFIX: &str = "composite::";
pub const COMPOSITE_SEPARATOR: &str = "||";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "kebab-case")]
pub enum ValueKey {
    Text(String),
    Integer(i64),
    Real(f64),
    Reference(ElementId),
}

impl ValueKey {
    /// Encode a value under the storage type it was captured with.
    pub fn encode(value: &Value) -> Option<ValueKey> {
        match (&value.payload, value.storage_type) {
            (ValuePayload::Composite(a, b), _) => Some(ValueKey::Text(encode_composite(a, b))),
            (ValuePayload::Text(s), StorageType::WholeNumber) => {
                s.trim().parse().ok().map(ValueKey::Integer)
            }
            (ValuePayload::Text(s), StorageType::RealNumber) => {
                s.trim().parse().ok().map(ValueKey::Real)
            }
            (ValuePayload::Text(s), _) => Some(ValueKey::Text(s.clone())),
            (ValuePayload::Integer(v), StorageType::Reference) => {
                Some(ValueKey::Reference(ElementId(*v)))
            }
            (ValuePayload::Integer(v), _) => Some(ValueKey::Integer(*v)),
            (ValuePayload::Real(v), _) => Some(ValueKey::Real(*v)),
            (ValuePayload::Reference(id), _) => Some(ValueKey::Reference(*id)),
            (ValuePayload::Empty, _) => None,
        }
    }

    /// The two fields of a composite key, if this is one and it is well formed.
    pub fn composite_parts(&self) -> Option<(String, String)> {
        match self {
            ValueKey::Text(s) => decode_composite(s),
            _ => None,
        }
    }

    fn is_composite(&self) -> bool {
        matches!(self, ValueKey::Text(s) if s.starts_with(COMPOSITE_PREFIX))
    }

    /// Whether two keys name the same value. Reals and integers compare
    /// within `epsilon`.
    pub fn matches(&self, other: &ValueKey, epsilon: f64) -> bool {
        if self.is_composite() || other.is_composite() {
            return match (self.composite_parts(), other.composite_parts()) {
                (Some((a1, b1)), Some((a2, b2))) => {
                    a1.to_lowercase() == a2.to_lowercase() && b1.to_lowercase() == b2.to_lowercase()
                }
                _ => false,
            };
        }

        match (self, other) {
            (ValueKey::Text(a), ValueKey::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            (ValueKey::Integer(a), ValueKey::Integer(b)) => a == b,
            (ValueKey::Real(a), ValueKey::Real(b)) => (a - b).abs() <= epsilon,
            (ValueKey::Integer(a), ValueKey::Real(b)) | (ValueKey::Real(b), ValueKey::Integer(a)) => {
                (*a as f64 - b).abs() <= epsilon
            }
            (ValueKey::Reference(a), ValueKey::Reference(b)) => a == b,
            _ => false,
        }
    }
}

pub fn encode_composite(first: &str, second: &str) -> String {
    format!("{}{}{}{}", COMPOSITE_PREFIX, first, COMPOSITE_SEPARATOR, second)
}

pub fn decode_composite(key: &str) -> Option<(String, String)> {
    let body = key.strip_prefix(COMPOSITE_PREFIX)?;
    let parts: Vec<&str> = body.split(COMPOSITE_SEPARATOR).collect();
    match parts.as_slice() {
        [first, second] => Some((first.to_string(), second.to_string())),
        _ => None,
    }
}

/// True when any of `keys` matches `value`.
pub fn contains_value(keys: &[ValueKey], value: &Value, epsilon: f64) -> bool {
    ValueKey::encode(value).is_some_and(|key| keys.iter().any(|k| k.matches(&key, epsilon)))
}

/// Drop values whose key matches an earlier one, keeping first occurrences.
pub fn dedupe_values(values: &[Value], epsilon: f64) -> Vec<Value> {
    let mut seen: Vec<ValueKey> = Vec::new();
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match ValueKey::encode(value) {
            Some(key) => {
                if seen.iter().any(|k| k.matches(&key, epsilon)) {
                    continue;
                }
                seen.push(key);
                out.push(value.clone());
            }
            None => out.push(value.clone()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn composite_round_trip() {
        let key = ValueKey::encode(&Value::composite("Duct", "24x12")).unwrap();
        assert_eq!(key, ValueKey::Text("composite::Duct||24x12".into()));
        assert_eq!(
            key.composite_parts(),
            Some(("Duct".to_string(), "24x12".to_string()))
        );
    }

    #[test]
    fn malformed_composite_key_fails_to_match() {
        let good = ValueKey::encode(&Value::composite("Duct", "24x12")).unwrap();
        let missing_sep = ValueKey::Text("composite::Duct24x12".into());
        let extra_sep = ValueKey::Text("composite::Duct||24||12".into());
        assert_eq!(missing_sep.composite_parts(), None);
        assert!(!good.matches(&missing_sep, EPS));
        assert!(!missing_sep.matches(&good, EPS));
        assert!(!missing_sep.matches(&missing_sep, EPS));
        assert!(!good.matches(&extra_sep, EPS));
    }

    #[test]
    fn text_keys_ignore_case() {
        let a = ValueKey::encode(&Value::text("Wall-1")).unwrap();
        let b = ValueKey::encode(&Value::text("WALL-1")).unwrap();
        assert!(a.matches(&b, EPS));
    }

    #[test]
    fn numeric_keys_compare_by_value() {
        assert!(ValueKey::Real(1.0).matches(&ValueKey::Real(1.0000005), EPS));
        assert!(!ValueKey::Real(1.0).matches(&ValueKey::Real(1.001), EPS));
        assert!(ValueKey::Integer(3).matches(&ValueKey::Real(3.0), EPS));
        assert!(!ValueKey::Integer(3).matches(&ValueKey::Integer(4), EPS));
    }

    #[test]
    fn text_payload_under_numeric_storage_is_parsed() {
        let v = Value::new("7", ValuePayload::Text("7".into()), StorageType::WholeNumber);
        assert_eq!(ValueKey::encode(&v), Some(ValueKey::Integer(7)));
    }

    #[test]
    fn reference_keys_compare_ids() {
        let a = ValueKey::encode(&Value::reference(ElementId(5), "L1")).unwrap();
        let b = ValueKey::encode(&Value::reference(ElementId(5), "Level 1")).unwrap();
        assert!(a.matches(&b, EPS));
        assert!(!a.matches(&ValueKey::Integer(5), EPS));
    }

    #[test]
    fn contains_value_checks_remembered_keys() {
        let keys = vec![ValueKey::Text("fire".into())];
        assert!(contains_value(&keys, &Value::text("Fire"), EPS));
        assert!(!contains_value(&keys, &Value::text("Smoke"), EPS));
    }

    #[test]
    fn real_keys_follow_the_given_tolerance() {
        let a = ValueKey::Real(2.0);
        let b = ValueKey::Real(2.004);
        assert!(!a.matches(&b, EPS));
        assert!(a.matches(&b, 0.01));

        let values = vec![Value::real(2.0), Value::real(2.004)];
        assert_eq!(dedupe_values(&values, EPS).len(), 2);
        assert_eq!(dedupe_values(&values, 0.01).len(), 1);
    }
}
