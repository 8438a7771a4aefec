//! FILENAME: core/crosstab-engine/src/value.rs
//! Bucket and measure values.
//!
//! Every value the engine sees has already been produced by the external
//! evaluator. Values are hashable so that equal bucket values collapse into
//! the same path key, and numbers are wrapped so NaN groups with NaN.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoercionError;

// ============================================================================
// ORDERED FLOAT
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash for use as map keys.
/// NaN values are treated as equal to each other and sort after every number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // 0.0 and -0.0 compare equal, so they must hash equal too.
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

impl OrderedFloat {
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

// ============================================================================
// VALUE KINDS
// ============================================================================

/// The declared kind of a bucket or measure value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    Integer,
    Number,
    /// Milliseconds since the Unix epoch.
    Date,
    Text,
    /// Handle to an object owned by the caller. Hashable, but has no order.
    Opaque,
}

impl Default for ValueKind {
    fn default() -> Self {
        ValueKind::Text
    }
}

impl ValueKind {
    /// Whether values of this kind can be sorted without a custom comparator.
    pub fn is_naturally_comparable(self) -> bool {
        !matches!(self, ValueKind::Opaque)
    }

    /// Whether values of this kind can be summed and averaged.
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Number)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::Date => "date",
            ValueKind::Text => "text",
            ValueKind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

// ============================================================================
// VALUE
// ============================================================================

/// A single evaluated value: a bucket key, an order key, a measure input or
/// an aggregated result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(OrderedFloat),
    Date(i64),
    Text(String),
    Opaque(u64),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind of this value, or `None` for null.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Integer(_) => Some(ValueKind::Integer),
            Value::Number(_) => Some(ValueKind::Number),
            Value::Date(_) => Some(ValueKind::Date),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Opaque(_) => Some(ValueKind::Opaque),
        }
    }

    /// Numeric view of integer and number values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(n.0),
            _ => None,
        }
    }

    /// Whether this is a numeric zero (integer 0, or 0.0 / -0.0).
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Integer(i) => *i == 0,
            Value::Number(n) => n.0 == 0.0,
            _ => false,
        }
    }

    /// Converts this value to the declared kind.
    ///
    /// Null stays null for every kind. Integers widen to numbers, integral
    /// numbers narrow to integers, text is parsed for numeric kinds and every
    /// ordered kind renders to text. Anything else is a coercion failure.
    pub fn coerce(self, kind: ValueKind) -> Result<Value, CoercionError> {
        if self.kind().map_or(true, |k| k == kind) {
            return Ok(self);
        }
        let coerced = match (&self, kind) {
            (Value::Integer(i), ValueKind::Number) => Some(Value::number(*i as f64)),
            (Value::Number(n), ValueKind::Integer) => {
                let f = n.0;
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(Value::Integer(f as i64))
                } else {
                    None
                }
            }
            (Value::Integer(i), ValueKind::Date) => Some(Value::Date(*i)),
            (Value::Date(d), ValueKind::Integer) => Some(Value::Integer(*d)),
            (Value::Text(s), ValueKind::Integer) => s.trim().parse::<i64>().ok().map(Value::Integer),
            (Value::Text(s), ValueKind::Number) => s.trim().parse::<f64>().ok().map(Value::number),
            (Value::Text(s), ValueKind::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            (Value::Boolean(_) | Value::Integer(_) | Value::Number(_) | Value::Date(_), ValueKind::Text) => {
                Some(Value::Text(self.to_string()))
            }
            _ => None,
        };
        coerced.ok_or_else(|| CoercionError::new(&self, kind))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("(null)"),
            Value::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n.0),
            Value::Date(d) => write!(f, "@{}", d),
            Value::Text(s) => f.write_str(s),
            Value::Opaque(h) => write!(f, "#{}", h),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
