//! FILENAME: core/crosstab-engine/src/ordering.rs
//! Bucket ordering and tie-breaking.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::definition::{BucketSpec, NullOrder, SortOrder};
use crate::error::ComparatorFault;
use crate::value::Value;

/// User-supplied ordering of two non-null bucket values.
pub trait BucketComparator: Send + Sync {
    fn compare(&self, a: &Value, b: &Value) -> Result<Ordering, ComparatorFault>;
}

impl<F> BucketComparator for F
where
    F: Fn(&Value, &Value) -> Result<Ordering, ComparatorFault> + Send + Sync,
{
    fn compare(&self, a: &Value, b: &Value) -> Result<Ordering, ComparatorFault> {
        self(a, b)
    }
}

/// Natural order of two values, or `None` when they have no order
/// (distinct opaque handles).
///
/// Kinds rank Null < Boolean < numbers < Date < Text < Opaque; integers and
/// numbers compare with each other numerically.
pub fn natural_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Number(_) => 2,
            Value::Date(_) => 3,
            Value::Text(_) => 4,
            Value::Opaque(_) => 5,
        }
    }

    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => Some(x.cmp(y)),
        (Value::Integer(x), Value::Number(y)) => Some(crate::value::OrderedFloat(*x as f64).cmp(y)),
        (Value::Number(x), Value::Integer(y)) => Some(x.cmp(&crate::value::OrderedFloat(*y as f64))),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Opaque(x), Value::Opaque(y)) => {
            if x == y {
                Some(Ordering::Equal)
            } else {
                None
            }
        }
        _ => Some(rank(a).cmp(&rank(b))),
    }
}

/// The resolved ordering policy of one bucket.
#[derive(Clone)]
pub struct BucketOrdering {
    order: SortOrder,
    null_order: NullOrder,
    comparator: Option<Arc<dyn BucketComparator>>,
}

impl std::fmt::Debug for BucketOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketOrdering")
            .field("order", &self.order)
            .field("null_order", &self.null_order)
            .field("comparator", &self.comparator.is_some())
            .finish()
    }
}

impl BucketOrdering {
    pub fn new(
        order: SortOrder,
        null_order: NullOrder,
        comparator: Option<Arc<dyn BucketComparator>>,
    ) -> Self {
        BucketOrdering {
            order,
            null_order,
            comparator,
        }
    }

    pub fn for_bucket(bucket: &BucketSpec, comparator: Option<Arc<dyn BucketComparator>>) -> Self {
        Self::new(bucket.order, bucket.null_order, comparator)
    }

    pub fn is_sorted(&self) -> bool {
        self.order != SortOrder::None
    }

    /// Compares two sort keys.
    ///
    /// The null group is placed by `null_order` regardless of direction; the
    /// comparator, when present, replaces natural ordering and is reversed
    /// for descending buckets.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Ordering, ComparatorFault> {
        if self.order == SortOrder::None {
            return Ok(Ordering::Equal);
        }

        match (a.is_null(), b.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(self.null_first_ordering()),
            (false, true) => return Ok(self.null_first_ordering().reverse()),
            (false, false) => {}
        }

        let ascending = match &self.comparator {
            Some(comparator) => comparator.compare(a, b)?,
            None => natural_cmp(a, b).ok_or_else(|| {
                ComparatorFault::new(format!("{} and {} have no natural order", a, b))
            })?,
        };

        Ok(match self.order {
            SortOrder::Descending => ascending.reverse(),
            _ => ascending,
        })
    }

    fn null_first_ordering(&self) -> Ordering {
        match self.null_order {
            NullOrder::First => Ordering::Less,
            NullOrder::Last => Ordering::Greater,
        }
    }
}

/// Stable merge sort with a fallible comparator.
///
/// Equal elements keep their input order. The first comparator fault stops
/// the sort and is returned.
pub fn try_stable_sort<T, E, F>(items: Vec<T>, mut compare: F) -> Result<Vec<T>, E>
where
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    sort_run(items, &mut compare)
}

fn sort_run<T, E, F>(mut items: Vec<T>, compare: &mut F) -> Result<Vec<T>, E>
where
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    if items.len() <= 1 {
        return Ok(items);
    }

    let right = items.split_off(items.len() / 2);
    let left = sort_run(items, compare)?;
    let right = sort_run(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(l, r)? == Ordering::Greater,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    Ok(merged)
}
