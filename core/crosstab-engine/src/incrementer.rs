//! FILENAME: core/crosstab-engine/src/incrementer.rs
//! Incrementers - fold raw values into aggregation state and merge states.
//!
//! Totals are computed by merging the states of finer cells, never by
//! re-reading rows, so every incrementer must support `merge` as well as
//! `increment`. Merges are associative and commutative: First and Nothing
//! carry the arrival sequence of their value so the merge order of a total
//! does not matter.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::definition::CalculationKind;
use crate::error::CoercionError;
use crate::ordering::natural_cmp;
use crate::value::{Value, ValueKind};

// ============================================================================
// CUSTOM INCREMENTERS
// ============================================================================

/// A pluggable aggregation. The state is a [`Value`] only this incrementer
/// interprets.
///
/// `merge` must be associative; totals merge partial states in tree order,
/// not arrival order.
pub trait CustomIncrementer: Send + Sync + fmt::Debug {
    /// State before any value has been folded in.
    fn initial_state(&self) -> Value {
        Value::Null
    }

    fn increment(&self, state: &Value, value: &Value) -> Result<Value, CoercionError>;

    fn merge(&self, left: &Value, right: &Value) -> Value;

    fn value(&self, state: &Value) -> Value;
}

// ============================================================================
// AGGREGATION STATE
// ============================================================================

/// Accumulated state of one measure in one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationState {
    /// Nothing folded in yet.
    Empty,
    Sum(Value),
    Count(u64),
    Distinct(FxHashSet<Value>),
    Average { sum: f64, count: u64 },
    /// Running minimum or maximum.
    Extreme(Value),
    /// First or last value with its arrival sequence.
    Sequenced { seq: u64, value: Value },
    /// Welford moments for variance and standard deviation.
    Moments { count: u64, mean: f64, m2: f64 },
    Custom(Value),
}

impl Default for AggregationState {
    fn default() -> Self {
        AggregationState::Empty
    }
}

// ============================================================================
// INCREMENTER
// ============================================================================

/// Built-in aggregations plus the plugin escape hatch.
#[derive(Debug, Clone)]
pub enum Incrementer {
    Sum,
    Count,
    DistinctCount,
    Average,
    Min,
    Max,
    First,
    Nothing,
    Variance,
    StandardDeviation,
    Custom(Arc<dyn CustomIncrementer>),
}

impl Incrementer {
    /// The built-in incrementer for a calculation, or `None` for `Custom`.
    pub fn builtin(kind: CalculationKind) -> Option<Self> {
        let incrementer = match kind {
            CalculationKind::Sum => Incrementer::Sum,
            CalculationKind::Count => Incrementer::Count,
            CalculationKind::DistinctCount => Incrementer::DistinctCount,
            CalculationKind::Average => Incrementer::Average,
            CalculationKind::Min => Incrementer::Min,
            CalculationKind::Max => Incrementer::Max,
            CalculationKind::First => Incrementer::First,
            CalculationKind::Nothing => Incrementer::Nothing,
            CalculationKind::Variance => Incrementer::Variance,
            CalculationKind::StandardDeviation => Incrementer::StandardDeviation,
            CalculationKind::Custom => return None,
        };
        Some(incrementer)
    }

    /// Folds one value into `state`. `seq` is the row's arrival number.
    ///
    /// Nulls are skipped by every built-in except First and Nothing, which
    /// record them like any other value. On error `state` is unchanged.
    pub fn increment(
        &self,
        state: &mut AggregationState,
        value: &Value,
        seq: u64,
    ) -> Result<(), CoercionError> {
        use AggregationState as S;

        match self {
            Incrementer::First => {
                if matches!(state, S::Empty) {
                    *state = S::Sequenced { seq, value: value.clone() };
                }
                return Ok(());
            }
            Incrementer::Nothing => {
                *state = S::Sequenced { seq, value: value.clone() };
                return Ok(());
            }
            Incrementer::Custom(plugin) => {
                let next = match state {
                    S::Custom(current) => plugin.increment(current, value)?,
                    _ => plugin.increment(&plugin.initial_state(), value)?,
                };
                *state = S::Custom(next);
                return Ok(());
            }
            _ => {}
        }

        if value.is_null() {
            return Ok(());
        }

        match self {
            Incrementer::Sum => {
                let next = match state {
                    S::Sum(acc) => add_numbers(acc, value),
                    _ => value.as_f64().map(|_| value.clone()),
                };
                *state = S::Sum(next.ok_or_else(|| CoercionError::new(value, ValueKind::Number))?);
            }
            Incrementer::Count => {
                let count = match state {
                    S::Count(n) => *n,
                    _ => 0,
                };
                *state = S::Count(count + 1);
            }
            Incrementer::DistinctCount => match state {
                S::Distinct(seen) => {
                    seen.insert(value.clone());
                }
                _ => {
                    let mut seen = FxHashSet::default();
                    seen.insert(value.clone());
                    *state = S::Distinct(seen);
                }
            },
            Incrementer::Average => {
                let x = numeric(value)?;
                match state {
                    S::Average { sum, count } => {
                        *sum += x;
                        *count += 1;
                    }
                    _ => *state = S::Average { sum: x, count: 1 },
                }
            }
            Incrementer::Min | Incrementer::Max => {
                let replace = match &*state {
                    S::Extreme(current) => self.is_better_extreme(value, current),
                    _ => true,
                };
                if replace {
                    *state = S::Extreme(value.clone());
                }
            }
            Incrementer::Variance | Incrementer::StandardDeviation => {
                let x = numeric(value)?;
                match state {
                    S::Moments { count, mean, m2 } => {
                        // Welford's algorithm for numerical stability
                        *count += 1;
                        let delta = x - *mean;
                        *mean += delta / (*count as f64);
                        let delta2 = x - *mean;
                        *m2 += delta * delta2;
                    }
                    _ => *state = S::Moments { count: 1, mean: x, m2: 0.0 },
                }
            }
            Incrementer::First | Incrementer::Nothing | Incrementer::Custom(_) => {}
        }
        Ok(())
    }

    /// Merges `other` into `into`, as if `into` had also seen every value
    /// folded into `other`.
    pub fn merge(&self, into: &mut AggregationState, other: &AggregationState) {
        use AggregationState as S;

        if matches!(other, S::Empty) {
            return;
        }
        if matches!(into, S::Empty) {
            *into = other.clone();
            return;
        }

        match (self, &mut *into, other) {
            (Incrementer::Sum, S::Sum(a), S::Sum(b)) => {
                if let Some(total) = add_numbers(a, b) {
                    *a = total;
                }
            }
            (Incrementer::Count, S::Count(a), S::Count(b)) => *a += *b,
            (Incrementer::DistinctCount, S::Distinct(a), S::Distinct(b)) => {
                a.extend(b.iter().cloned());
            }
            (Incrementer::Average, S::Average { sum, count }, S::Average { sum: s, count: c }) => {
                *sum += *s;
                *count += *c;
            }
            (Incrementer::Min | Incrementer::Max, S::Extreme(a), S::Extreme(b)) => {
                if self.is_better_extreme(b, a) {
                    *a = b.clone();
                }
            }
            (Incrementer::First, S::Sequenced { seq, value }, S::Sequenced { seq: s, value: v }) => {
                if *s < *seq {
                    *seq = *s;
                    *value = v.clone();
                }
            }
            (Incrementer::Nothing, S::Sequenced { seq, value }, S::Sequenced { seq: s, value: v }) => {
                if *s > *seq {
                    *seq = *s;
                    *value = v.clone();
                }
            }
            (
                Incrementer::Variance | Incrementer::StandardDeviation,
                S::Moments { count, mean, m2 },
                S::Moments { count: oc, mean: om, m2: om2 },
            ) => {
                // Parallel Welford merge
                let combined = *count + *oc;
                let delta = *om - *mean;
                let n_a = *count as f64;
                let n_b = *oc as f64;
                *mean += delta * n_b / (combined as f64);
                *m2 += *om2 + delta * delta * n_a * n_b / (combined as f64);
                *count = combined;
            }
            (Incrementer::Custom(plugin), S::Custom(a), S::Custom(b)) => {
                *a = plugin.merge(a, b);
            }
            _ => {}
        }
    }

    /// Reads the aggregated result out of a state.
    pub fn value(&self, state: &AggregationState) -> Value {
        use AggregationState as S;

        match (self, state) {
            (Incrementer::Count | Incrementer::DistinctCount, S::Empty) => Value::Integer(0),
            (Incrementer::Custom(plugin), S::Empty) => plugin.value(&plugin.initial_state()),
            (_, S::Empty) => Value::Null,
            (_, S::Sum(v)) => v.clone(),
            (_, S::Count(n)) => Value::Integer(*n as i64),
            (_, S::Distinct(seen)) => Value::Integer(seen.len() as i64),
            (_, S::Average { sum, count }) => {
                if *count > 0 {
                    Value::number(sum / (*count as f64))
                } else {
                    Value::Null
                }
            }
            (_, S::Extreme(v)) => v.clone(),
            (_, S::Sequenced { value, .. }) => value.clone(),
            (_, S::Moments { count, m2, .. }) => {
                let variance = if *count > 1 {
                    (m2 / ((*count - 1) as f64)).max(0.0)
                } else {
                    0.0
                };
                match self {
                    Incrementer::StandardDeviation => Value::number(variance.sqrt()),
                    _ => Value::number(variance),
                }
            }
            (Incrementer::Custom(plugin), S::Custom(v)) => plugin.value(v),
            (_, S::Custom(v)) => v.clone(),
        }
    }

    fn is_better_extreme(&self, candidate: &Value, current: &Value) -> bool {
        let ordering = natural_cmp(candidate, current).unwrap_or(Ordering::Equal);
        match self {
            Incrementer::Min => ordering == Ordering::Less,
            _ => ordering == Ordering::Greater,
        }
    }
}

/// Adds two numeric values, staying integral while the sum fits in an i64.
fn add_numbers(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(
            x.checked_add(*y)
                .map(Value::Integer)
                .unwrap_or_else(|| Value::number(*x as f64 + *y as f64)),
        ),
        _ => Some(Value::number(a.as_f64()? + b.as_f64()?)),
    }
}

fn numeric(value: &Value) -> Result<f64, CoercionError> {
    value
        .as_f64()
        .ok_or_else(|| CoercionError::new(value, ValueKind::Number))
}

// ============================================================================
// AGGREGATION CELL
// ============================================================================

/// State of one measure in one (row path, column path) cell, plus whether a
/// value failed to fold into it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregationCell {
    state: AggregationState,
    error: Option<String>,
}

impl AggregationCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// The first failure recorded for this cell.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Folds an evaluated value, or records why there is none.
    pub fn fold(&mut self, incrementer: &Incrementer, outcome: Result<Value, String>, seq: u64) {
        let result = outcome.and_then(|value| {
            incrementer
                .increment(&mut self.state, &value, seq)
                .map_err(|e| e.to_string())
        });
        if let Err(reason) = result {
            self.invalidate(reason);
        }
    }

    /// Merges a finer cell into this one. Only the folded state travels; a
    /// failure stays on the cell it happened in.
    pub fn merge_from(&mut self, incrementer: &Incrementer, other: &AggregationCell) {
        incrementer.merge(&mut self.state, &other.state);
    }

    /// The aggregated value, or null for an invalid cell.
    pub fn value(&self, incrementer: &Incrementer) -> Value {
        if self.is_valid() {
            incrementer.value(&self.state)
        } else {
            Value::Null
        }
    }

    fn invalidate(&mut self, reason: String) {
        if self.error.is_none() {
            self.error = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_all(incrementer: &Incrementer, values: &[Value], first_seq: u64) -> AggregationState {
        let mut state = AggregationState::Empty;
        for (i, value) in values.iter().enumerate() {
            incrementer.increment(&mut state, value, first_seq + i as u64).unwrap();
        }
        state
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Integer(v)).collect()
    }

    #[test]
    fn test_sum_stays_integral() {
        let state = fold_all(&Incrementer::Sum, &ints(&[10, 5, 7]), 0);
        assert_eq!(Incrementer::Sum.value(&state), Value::Integer(22));
    }

    #[test]
    fn test_sum_overflow_promotes_to_number() {
        let state = fold_all(&Incrementer::Sum, &ints(&[i64::MAX, 1]), 0);
        assert!(matches!(Incrementer::Sum.value(&state), Value::Number(_)));
    }

    #[test]
    fn test_sum_rejects_text() {
        let mut state = AggregationState::Empty;
        assert!(Incrementer::Sum.increment(&mut state, &Value::text("x"), 0).is_err());
        assert_eq!(state, AggregationState::Empty);
    }

    #[test]
    fn test_nulls_are_skipped() {
        let values = vec![Value::Integer(4), Value::Null, Value::Integer(2)];
        let count = fold_all(&Incrementer::Count, &values, 0);
        assert_eq!(Incrementer::Count.value(&count), Value::Integer(2));
        let avg = fold_all(&Incrementer::Average, &values, 0);
        assert_eq!(Incrementer::Average.value(&avg), Value::number(3.0));
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(Incrementer::Count.value(&AggregationState::Empty), Value::Integer(0));
        assert_eq!(Incrementer::DistinctCount.value(&AggregationState::Empty), Value::Integer(0));
        assert_eq!(Incrementer::Sum.value(&AggregationState::Empty), Value::Null);
        assert_eq!(Incrementer::Average.value(&AggregationState::Empty), Value::Null);
    }

    #[test]
    fn test_average_merges_pairs_not_averages() {
        let left = fold_all(&Incrementer::Average, &ints(&[1, 2, 3, 4]), 0);
        let right = fold_all(&Incrementer::Average, &ints(&[10]), 4);
        let mut merged = left.clone();
        Incrementer::Average.merge(&mut merged, &right);
        // (1+2+3+4+10)/5, not (2.5+10)/2
        assert_eq!(Incrementer::Average.value(&merged), Value::number(4.0));
    }

    #[test]
    fn test_merge_matches_direct_fold() {
        let values = ints(&[3, 9, 1, 9, 4, 7]);
        for incrementer in [
            Incrementer::Sum,
            Incrementer::Count,
            Incrementer::DistinctCount,
            Incrementer::Average,
            Incrementer::Min,
            Incrementer::Max,
            Incrementer::First,
            Incrementer::Nothing,
        ] {
            let direct = fold_all(&incrementer, &values, 0);
            let left = fold_all(&incrementer, &values[..2], 0);
            let right = fold_all(&incrementer, &values[2..], 2);

            let mut forward = left.clone();
            incrementer.merge(&mut forward, &right);
            let mut backward = right.clone();
            incrementer.merge(&mut backward, &left);

            assert_eq!(incrementer.value(&forward), incrementer.value(&direct), "{:?}", incrementer);
            assert_eq!(incrementer.value(&backward), incrementer.value(&direct), "{:?}", incrementer);
        }
    }

    #[test]
    fn test_first_and_nothing_follow_arrival_order() {
        let values = vec![Value::text("a"), Value::text("b"), Value::text("c")];
        let first = fold_all(&Incrementer::First, &values, 0);
        let last = fold_all(&Incrementer::Nothing, &values, 0);
        assert_eq!(Incrementer::First.value(&first), Value::text("a"));
        assert_eq!(Incrementer::Nothing.value(&last), Value::text("c"));
    }

    #[test]
    fn test_variance_merge() {
        let values: Vec<Value> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|&v| Value::number(v))
            .collect();
        let direct = fold_all(&Incrementer::Variance, &values, 0);
        let mut merged = fold_all(&Incrementer::Variance, &values[..3], 0);
        Incrementer::Variance.merge(&mut merged, &fold_all(&Incrementer::Variance, &values[3..], 3));

        let expected = 32.0 / 7.0;
        for state in [&direct, &merged] {
            let v = Incrementer::Variance.value(state).as_f64().unwrap();
            assert!((v - expected).abs() < 1e-9);
        }
        let sd = Incrementer::StandardDeviation.value(&merged).as_f64().unwrap();
        assert!((sd - expected.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_min_max_over_text() {
        let values = vec![Value::text("pear"), Value::text("apple"), Value::text("zucchini")];
        let min = fold_all(&Incrementer::Min, &values, 0);
        let max = fold_all(&Incrementer::Max, &values, 0);
        assert_eq!(Incrementer::Min.value(&min), Value::text("apple"));
        assert_eq!(Incrementer::Max.value(&max), Value::text("zucchini"));
    }

    #[derive(Debug)]
    struct Product;

    impl CustomIncrementer for Product {
        fn initial_state(&self) -> Value {
            Value::Integer(1)
        }

        fn increment(&self, state: &Value, value: &Value) -> Result<Value, CoercionError> {
            match (state, value) {
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a * b)),
                (_, Value::Null) => Ok(state.clone()),
                _ => Err(CoercionError::new(value, ValueKind::Integer)),
            }
        }

        fn merge(&self, left: &Value, right: &Value) -> Value {
            match (left, right) {
                (Value::Integer(a), Value::Integer(b)) => Value::Integer(a * b),
                _ => Value::Null,
            }
        }

        fn value(&self, state: &Value) -> Value {
            state.clone()
        }
    }

    #[test]
    fn test_custom_incrementer() {
        let incrementer = Incrementer::Custom(Arc::new(Product));
        assert_eq!(incrementer.value(&AggregationState::Empty), Value::Integer(1));
        let mut left = fold_all(&incrementer, &ints(&[2, 3]), 0);
        let right = fold_all(&incrementer, &ints(&[4]), 2);
        incrementer.merge(&mut left, &right);
        assert_eq!(incrementer.value(&left), Value::Integer(24));
    }

    #[test]
    fn test_invalid_cell_does_not_spread_to_totals() {
        let mut bad = AggregationCell::new();
        bad.fold(&Incrementer::Sum, Err("cannot convert".to_string()), 0);
        let mut good = AggregationCell::new();
        good.fold(&Incrementer::Sum, Ok(Value::Integer(5)), 1);

        assert!(!bad.is_valid());
        assert!(good.is_valid());
        assert_eq!(good.value(&Incrementer::Sum), Value::Integer(5));

        let mut total = AggregationCell::new();
        total.merge_from(&Incrementer::Sum, &good);
        total.merge_from(&Incrementer::Sum, &bad);
        assert!(total.is_valid());
        assert_eq!(total.value(&Incrementer::Sum), Value::Integer(5));
        assert_eq!(total.error(), None);
    }
}
