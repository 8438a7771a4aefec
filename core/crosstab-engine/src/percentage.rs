//! FILENAME: core/crosstab-engine/src/percentage.rs
//! Percentage of grand total.
//!
//! Percentages are ratios: the grand-total cell itself is 1.0.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::value::Value;

/// Decimal places kept by integer percentages.
const INTEGER_SCALE: i128 = 10_000;

/// User-supplied percentage computation. Returns `None` when the percentage
/// is undefined for this pair.
pub trait CustomPercentageCalculator: Send + Sync {
    fn percentage(&self, value: &Value, grand_total: &Value) -> Option<Value>;
}

impl<F> CustomPercentageCalculator for F
where
    F: Fn(&Value, &Value) -> Option<Value> + Send + Sync,
{
    fn percentage(&self, value: &Value, grand_total: &Value) -> Option<Value> {
        self(value, grand_total)
    }
}

/// Percentage of one measure in one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Percentage {
    /// The measure does not report percentages.
    NotApplicable,
    /// Zero, missing or invalid grand total, or a value that cannot be divided.
    Undefined,
    Defined(Value),
}

impl Percentage {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Percentage::Defined(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Percentage::Defined(_))
    }
}

/// Division strategy for one measure.
#[derive(Clone)]
pub enum PercentageCalculator {
    /// Exact integer division, rounded half away from zero at four decimals.
    Integer,
    /// Plain floating-point division.
    Float,
    Custom(Arc<dyn CustomPercentageCalculator>),
}

impl fmt::Debug for PercentageCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentageCalculator::Integer => write!(f, "Integer"),
            PercentageCalculator::Float => write!(f, "Float"),
            PercentageCalculator::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl PercentageCalculator {
    /// Picks the built-in calculator matching the grand total's kind.
    pub fn for_grand_total(grand_total: &Value) -> Option<Self> {
        match grand_total {
            Value::Integer(_) => Some(PercentageCalculator::Integer),
            Value::Number(_) => Some(PercentageCalculator::Float),
            _ => None,
        }
    }

    /// `value / grand_total`. A zero or null grand total is always undefined.
    pub fn percentage(&self, value: &Value, grand_total: &Value) -> Percentage {
        if grand_total.is_null() || grand_total.is_zero() {
            return Percentage::Undefined;
        }

        let result = match self {
            PercentageCalculator::Integer => match (value, grand_total) {
                (Value::Integer(v), Value::Integer(t)) => Some(integer_ratio(*v, *t)),
                _ => float_ratio(value, grand_total),
            },
            PercentageCalculator::Float => float_ratio(value, grand_total),
            PercentageCalculator::Custom(calculator) => calculator.percentage(value, grand_total),
        };

        match result {
            Some(v) => Percentage::Defined(v),
            None => Percentage::Undefined,
        }
    }
}

fn integer_ratio(value: i64, total: i64) -> Value {
    let numerator = value as i128 * INTEGER_SCALE;
    let denominator = total as i128;
    let mut quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient += numerator.signum() * denominator.signum();
    }
    Value::number(quotient as f64 / INTEGER_SCALE as f64)
}

fn float_ratio(value: &Value, grand_total: &Value) -> Option<Value> {
    Some(Value::number(value.as_f64()? / grand_total.as_f64()?))
}
