//! FILENAME: core/crosstab-engine/src/definition.rs
//! Crosstab Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a crosstab.
//! These structures are designed to be:
//! - Serializable (saved alongside the report design)
//! - Built once before fill starts
//! - Read-only while rows are consumed

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::CrosstabError;
use crate::matrix::CellMatrix;
use crate::value::ValueKind;

// ============================================================================
// VALUE PRODUCERS
// ============================================================================

/// Reference to an expression owned by the external evaluator.
/// The engine never interprets the text; it only hands it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueProducer(pub String);

impl ValueProducer {
    pub fn new(expression: impl Into<String>) -> Self {
        ValueProducer(expression.into())
    }

    pub fn expression(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// BUCKETS
// ============================================================================

/// Sort order for a bucket's distinct values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
    /// Keep first-seen order.
    None,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Ascending
    }
}

/// Where the null group goes, independent of the sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullOrder {
    First,
    Last,
}

impl Default for NullOrder {
    fn default() -> Self {
        NullOrder::First
    }
}

/// One grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    /// Produces the bucket value for a row.
    pub expression: ValueProducer,

    /// Declared kind; evaluated values are coerced to it.
    pub value_kind: ValueKind,

    #[serde(default)]
    pub order: SortOrder,

    /// Sorts groups by this value (first-seen per group) instead of the
    /// bucket value itself.
    #[serde(default)]
    pub order_key: Option<ValueProducer>,

    /// Identifier of a comparator registered in the registry. Takes
    /// precedence over natural ordering.
    #[serde(default)]
    pub comparator: Option<String>,

    #[serde(default)]
    pub null_order: NullOrder,
}

impl BucketSpec {
    pub fn new(expression: impl Into<String>, value_kind: ValueKind) -> Self {
        BucketSpec {
            expression: ValueProducer::new(expression),
            value_kind,
            order: SortOrder::Ascending,
            order_key: None,
            comparator: None,
            null_order: NullOrder::First,
        }
    }

    /// Whether groups of this bucket are sorted at all.
    pub fn is_sorted(&self) -> bool {
        self.order != SortOrder::None
    }
}

// ============================================================================
// GROUPS
// ============================================================================

/// Position of a group's total relative to its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalPosition {
    Start,
    End,
}

impl Default for TotalPosition {
    fn default() -> Self {
        TotalPosition::End
    }
}

/// A row or column group. Both axes use the same type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Unique among all row and column groups.
    pub name: String,

    pub bucket: BucketSpec,

    /// Content reference for the group's header cells.
    #[serde(default)]
    pub header: Option<String>,

    /// Content reference for the group's total header cell.
    #[serde(default)]
    pub total_header: Option<String>,

    /// Whether a total is rendered for this group.
    #[serde(default = "default_true")]
    pub has_total: bool,

    #[serde(default)]
    pub total_position: TotalPosition,

    /// Merge adjacent header cells of the same group value into one spanning cell.
    #[serde(default = "default_true")]
    pub merge_header_cells: bool,
}

fn default_true() -> bool {
    true
}

impl GroupSpec {
    pub fn new(name: impl Into<String>, bucket: BucketSpec) -> Self {
        GroupSpec {
            name: name.into(),
            bucket,
            header: None,
            total_header: None,
            has_total: true,
            total_position: TotalPosition::End,
            merge_header_cells: true,
        }
    }
}

// ============================================================================
// MEASURES
// ============================================================================

/// Aggregation applied to a measure's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationKind {
    Sum,
    Count,
    DistinctCount,
    Average,
    Min,
    Max,
    First,
    /// No aggregation; the last value wins.
    Nothing,
    /// Sample variance.
    Variance,
    /// Sample standard deviation.
    StandardDeviation,
    /// Resolved through the measure's incrementer id.
    Custom,
}

impl Default for CalculationKind {
    fn default() -> Self {
        CalculationKind::Sum
    }
}

impl CalculationKind {
    /// Calculations that only make sense over numbers.
    pub fn requires_numeric(self) -> bool {
        matches!(
            self,
            CalculationKind::Sum
                | CalculationKind::Average
                | CalculationKind::Variance
                | CalculationKind::StandardDeviation
        )
    }
}

/// Whether a measure also reports its share of the grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PercentageMode {
    None,
    GrandTotal,
}

impl Default for PercentageMode {
    fn default() -> Self {
        PercentageMode::None
    }
}

/// A value aggregated into every crosstab cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureSpec {
    /// Unique among measures.
    pub name: String,

    pub expression: ValueProducer,

    /// Declared kind; evaluated values are coerced to it.
    pub value_kind: ValueKind,

    #[serde(default)]
    pub calculation: CalculationKind,

    /// Registered incrementer to use instead of the built-in one.
    #[serde(default)]
    pub incrementer_id: Option<String>,

    #[serde(default)]
    pub percentage_mode: PercentageMode,

    /// Registered percentage calculator. Without one, the calculator is
    /// chosen from the grand total's kind.
    #[serde(default)]
    pub percentage_calculator_id: Option<String>,
}

impl MeasureSpec {
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        value_kind: ValueKind,
        calculation: CalculationKind,
    ) -> Self {
        MeasureSpec {
            name: name.into(),
            expression: ValueProducer::new(expression),
            value_kind,
            calculation,
            incrementer_id: None,
            percentage_mode: PercentageMode::None,
            percentage_calculator_id: None,
        }
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete, serializable definition of a crosstab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabDefinition {
    #[serde(default)]
    pub name: Option<String>,

    /// Row groups, outermost first.
    pub row_groups: Vec<GroupSpec>,

    /// Column groups, outermost first.
    pub column_groups: Vec<GroupSpec>,

    pub measures: Vec<MeasureSpec>,

    /// Cell contents addressed by total level.
    pub cells: CellMatrix,
}

impl CrosstabDefinition {
    /// Creates an empty definition. Groups, measures and cells are added by
    /// the caller before filling.
    pub fn new() -> Self {
        CrosstabDefinition {
            name: None,
            row_groups: Vec::new(),
            column_groups: Vec::new(),
            measures: Vec::new(),
            cells: CellMatrix::default(),
        }
    }

    pub fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    pub fn column_group_count(&self) -> usize {
        self.column_groups.len()
    }

    /// Index of a measure by name.
    pub fn measure_index(&self, name: &str) -> Option<usize> {
        self.measures.iter().position(|m| m.name == name)
    }

    /// All groups, rows first.
    pub fn groups(&self) -> impl Iterator<Item = &GroupSpec> {
        self.row_groups.iter().chain(self.column_groups.iter())
    }

    /// Checks everything that can be checked without a registry.
    ///
    /// Identifier resolution happens when the accumulator is created.
    pub fn validate(&self) -> Result<(), CrosstabError> {
        if self.measures.is_empty() {
            return Err(CrosstabError::NoMeasures);
        }

        let mut group_names = FxHashSet::default();
        for group in self.groups() {
            if !group_names.insert(group.name.as_str()) {
                return Err(CrosstabError::DuplicateGroup(group.name.clone()));
            }
            let bucket = &group.bucket;
            if bucket.is_sorted()
                && bucket.comparator.is_none()
                && bucket.order_key.is_none()
                && !bucket.value_kind.is_naturally_comparable()
            {
                return Err(CrosstabError::NonComparableBucket {
                    group: group.name.clone(),
                    kind: bucket.value_kind,
                });
            }
        }

        let mut measure_names = FxHashSet::default();
        for measure in &self.measures {
            if !measure_names.insert(measure.name.as_str()) {
                return Err(CrosstabError::DuplicateMeasure(measure.name.clone()));
            }
            if measure.incrementer_id.is_none() {
                if measure.calculation == CalculationKind::Custom {
                    return Err(CrosstabError::MissingIncrementerId {
                        measure: measure.name.clone(),
                    });
                }
                if measure.calculation.requires_numeric() && !measure.value_kind.is_numeric() {
                    return Err(CrosstabError::NonNumericMeasure {
                        measure: measure.name.clone(),
                        calculation: format!("{:?}", measure.calculation),
                        kind: measure.value_kind,
                    });
                }
            }
        }

        self.cells
            .resolve(self.row_group_count(), self.column_group_count())
            .map(|_| ())
    }
}

impl Default for CrosstabDefinition {
    fn default() -> Self {
        Self::new()
    }
}
