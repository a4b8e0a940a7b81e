//! Scalar values bound into page statements and stored in cursors.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scalar SQL value.
///
/// `SqlValue` serves two purposes: bind parameters for query templates, and
/// cursor key values extracted from the last row of a page. The serde
/// representation is tagged so persisted cursor state remains a list of
/// primitive-typed key-value pairs.
///
/// The variant set is deliberately small: numeric keys are 64-bit integers,
/// string keys are text, and uuids cover the common uniquely-identifying
/// trailing column. Values of other column types (dates, enums) can be bound
/// as text with an explicit cast in the template SQL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    /// A 64-bit signed integer.
    BigInt(i64),
    /// A text value.
    Text(String),
    /// A uuid value.
    Uuid(Uuid),
    /// A boolean value.
    Bool(bool),
}

impl SqlValue {
    /// Returns a short name for the value's SQL type.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::BigInt(_) => "bigint",
            SqlValue::Text(_) => "text",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::BigInt(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "{v}"),
            SqlValue::Uuid(v) => write!(f, "{v}"),
            SqlValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::BigInt(i64::from(value))
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(SqlValue::from(42i64), SqlValue::BigInt(42));
        assert_eq!(SqlValue::from(7i32), SqlValue::BigInt(7));
        assert_eq!(SqlValue::from("abc"), SqlValue::Text("abc".to_string()));
        assert_eq!(SqlValue::from(true), SqlValue::Bool(true));
    }

    #[test]
    fn ordering_within_variants() {
        assert!(SqlValue::BigInt(1) < SqlValue::BigInt(2));
        assert!(SqlValue::Text("1".into()) < SqlValue::Text("2".into()));
    }

    #[test]
    fn lexicographic_ordering_of_composite_keys() {
        // Vec ordering is lexicographic, which is exactly the composite-key
        // continuation semantics the in-memory source relies on.
        let a = vec![SqlValue::Text("a".into()), SqlValue::BigInt(9)];
        let b = vec![SqlValue::Text("a".into()), SqlValue::BigInt(10)];
        let c = vec![SqlValue::Text("b".into()), SqlValue::BigInt(1)];
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn serde_tagged_representation() {
        let value = SqlValue::BigInt(5);
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, r#"{"type":"big_int","value":5}"#);

        let back: SqlValue = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, value);
    }
}
