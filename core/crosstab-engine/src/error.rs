//! FILENAME: core/crosstab-engine/src/error.rs

use thiserror::Error;

use crate::matrix::TotalLevel;
use crate::value::{Value, ValueKind};

/// Fatal errors. Any of these aborts the whole crosstab.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrosstabError {
    #[error("crosstab has no measures")]
    NoMeasures,

    #[error("duplicate group name '{0}'")]
    DuplicateGroup(String),

    #[error("duplicate measure name '{0}'")]
    DuplicateMeasure(String),

    #[error("cell matrix has no base cell definition")]
    MissingBaseCell,

    #[error("cell definition at ({row:?}, {column:?}) is outside the {row_groups}x{column_groups} group layout")]
    CellOutOfRange {
        row: TotalLevel,
        column: TotalLevel,
        row_groups: usize,
        column_groups: usize,
    },

    #[error("cell definition at ({row:?}, {column:?}) is defined twice")]
    DuplicateCell { row: TotalLevel, column: TotalLevel },

    #[error("group '{group}': {kind} values have no natural order; supply a comparator or use unordered buckets")]
    NonComparableBucket { group: String, kind: ValueKind },

    #[error("group '{group}': no comparator registered under '{id}'")]
    UnresolvedComparator { group: String, id: String },

    #[error("measure '{measure}': {calculation} needs a numeric value kind, not {kind}")]
    NonNumericMeasure {
        measure: String,
        calculation: String,
        kind: ValueKind,
    },

    #[error("measure '{measure}': custom calculation without an incrementer id")]
    MissingIncrementerId { measure: String },

    #[error("measure '{measure}': no incrementer registered under '{id}'")]
    UnresolvedIncrementer { measure: String, id: String },

    #[error("measure '{measure}': no percentage calculator registered under '{id}'")]
    UnresolvedPercentageCalculator { measure: String, id: String },

    #[error("group '{group}': bucket evaluation failed on row {row}: {source}")]
    BucketEvaluation {
        group: String,
        row: u64,
        #[source]
        source: EvaluationError,
    },

    #[error("group '{group}': ordering failed: {source}")]
    Ordering {
        group: String,
        #[source]
        source: ComparatorFault,
    },
}

/// Failure reported by the external evaluator for one value producer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot evaluate '{expression}': {message}")]
pub struct EvaluationError {
    pub expression: String,
    pub message: String,
}

impl EvaluationError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        EvaluationError {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// A value that does not fit the declared kind. Local to one cell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {value} to {target}")]
pub struct CoercionError {
    pub value: String,
    pub target: ValueKind,
}

impl CoercionError {
    pub fn new(value: &Value, target: ValueKind) -> Self {
        CoercionError {
            value: format!("{:?}", value),
            target,
        }
    }
}

/// A comparator that could not order two bucket values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ComparatorFault(pub String);

impl ComparatorFault {
    pub fn new(message: impl Into<String>) -> Self {
        ComparatorFault(message.into())
    }
}
