//! Value model
//!
//! The closed set of value kinds the store accepts.
//!
//! ## Responsibilities
//! - Define the tagged unions for stored values (`Value`) and the scalar
//!   subset allowed inside collections (`Scalar`)
//! - Report a value's kind for error messages and kind checks
//! - Round-trip each value through its self-describing JSON text form
//!
//! ## Serialization
//! Both enums are `#[serde(untagged)]`: a string encodes as `"x"`, an
//! integer as `1`, a list as `[..]`, and so on. `Int` is declared before
//! `Float` so integral numbers deserialize back as integers.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar value: the only kinds permitted inside lists and dicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// UTF-8 string
    Str(String),

    /// Signed 64-bit integer
    Int(i64),

    /// 64-bit float
    Float(f64),

    /// Boolean
    Bool(bool),
}

/// A stored value: scalars plus the two collection kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// UTF-8 string
    Str(String),

    /// Signed 64-bit integer
    Int(i64),

    /// 64-bit float
    Float(f64),

    /// Boolean
    Bool(bool),

    /// Ordered list of scalars
    List(Vec<Scalar>),

    /// Mapping of string to scalar (unordered)
    Dict(HashMap<String, Scalar>),
}

/// Kind tag for a `Value` or `Scalar`, used in kind-mismatch errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Str => "string",
            Kind::Int => "integer",
            Kind::Float => "float",
            Kind::Bool => "boolean",
            Kind::List => "list",
            Kind::Dict => "dict",
        };
        f.write_str(name)
    }
}

impl Scalar {
    /// The kind tag for this scalar
    pub fn kind(&self) -> Kind {
        match self {
            Scalar::Str(_) => Kind::Str,
            Scalar::Int(_) => Kind::Int,
            Scalar::Float(_) => Kind::Float,
            Scalar::Bool(_) => Kind::Bool,
        }
    }
}

impl Value {
    /// The kind tag for this value
    pub fn kind(&self) -> Kind {
        match self {
            Value::Str(_) => Kind::Str,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Bool(_) => Kind::Bool,
            Value::List(_) => Kind::List,
            Value::Dict(_) => Kind::Dict,
        }
    }

    /// Borrow the string if this is a `Str` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Extract the integer if this is an `Int` value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract the float if this is a `Float` value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Extract the boolean if this is a `Bool` value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the elements if this is a `List` value
    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the entries if this is a `Dict` value
    pub fn as_dict(&self) -> Option<&HashMap<String, Scalar>> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Int(n as i64)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Str(s) => Value::Str(s),
            Scalar::Int(n) => Value::Int(n),
            Scalar::Float(x) => Value::Float(x),
            Scalar::Bool(b) => Value::Bool(b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(items: Vec<Scalar>) -> Self {
        Value::List(items)
    }
}

impl From<HashMap<String, Scalar>> for Value {
    fn from(entries: HashMap<String, Scalar>) -> Self {
        Value::Dict(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_reporting() {
        assert_eq!(Value::from("x").kind(), Kind::Str);
        assert_eq!(Value::from(1).kind(), Kind::Int);
        assert_eq!(Value::from(1.5).kind(), Kind::Float);
        assert_eq!(Value::from(true).kind(), Kind::Bool);
        assert_eq!(Value::List(vec![]).kind(), Kind::List);
        assert_eq!(Value::Dict(HashMap::new()).kind(), Kind::Dict);
    }

    #[test]
    fn test_json_text_form_round_trip() {
        let values = vec![
            Value::from("hello"),
            Value::from(-42),
            Value::from(2.75),
            Value::from(false),
            Value::List(vec![Scalar::from(1), Scalar::from("two")]),
            Value::Dict(HashMap::from([("k".to_string(), Scalar::from(3))])),
        ];

        for value in values {
            let text = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_integers_stay_integral() {
        // Untagged deserialization must not widen 7 into Float(7.0)
        let back: Value = serde_json::from_str("7").unwrap();
        assert_eq!(back, Value::Int(7));

        let back: Value = serde_json::from_str("7.0").unwrap();
        assert_eq!(back, Value::Float(7.0));
    }

    #[test]
    fn test_scalar_text_form_is_self_describing() {
        assert_eq!(serde_json::to_string(&Scalar::from("x")).unwrap(), "\"x\"");
        assert_eq!(serde_json::to_string(&Scalar::from(1)).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Scalar::from(true)).unwrap(), "true");
    }
}
