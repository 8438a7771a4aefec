//! FILENAME: core/crosstab-engine/src/accumulator.rs
//! Crosstab Accumulator - the fill engine.
//!
//! A fill moves through three states, each its own type:
//! 1. `CrosstabAccumulator` consumes rows. Every row is placed on a row leaf
//!    and a column leaf, and its measure values are folded into the base cell
//!    of that pair.
//! 2. `RolledUpCrosstab` holds the ordered group trees and every total,
//!    computed bottom-up by merging child cells.
//! 3. `CrosstabResult` adds percentages of the grand total.
//!
//! Queries only exist on the states where they are meaningful.

use std::fmt;

use log::{debug, info, trace, warn};
use rustc_hash::FxHashMap;

use crate::definition::{CrosstabDefinition, GroupSpec, PercentageMode};
use crate::error::{CrosstabError, EvaluationError};
use crate::evaluator::RowEvaluator;
use crate::incrementer::{AggregationCell, Incrementer};
use crate::matrix::ResolvedCellMatrix;
use crate::ordering::BucketOrdering;
use crate::percentage::{Percentage, PercentageCalculator};
use crate::registry::IncrementerRegistry;
use crate::result::{CellStatus, CrosstabResult, FillStats, MeasureCell};
use crate::tree::{AxisIndex, GroupTree, LeafId, NodeId, PathKey};
use crate::value::Value;

/// Names the fill states in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPhase {
    Accumulating,
    RolledUp,
    PercentagesResolved,
}

impl fmt::Display for FillPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FillPhase::Accumulating => "accumulating",
            FillPhase::RolledUp => "rolled up",
            FillPhase::PercentagesResolved => "percentages resolved",
        };
        f.write_str(name)
    }
}

fn crosstab_name(definition: &CrosstabDefinition) -> &str {
    definition.name.as_deref().unwrap_or("crosstab")
}

fn empty_cells(count: usize) -> Vec<AggregationCell> {
    vec![AggregationCell::new(); count]
}

// ============================================================================
// ACCUMULATING
// ============================================================================

pub struct CrosstabAccumulator<'a> {
    definition: &'a CrosstabDefinition,
    incrementers: Vec<Incrementer>,
    /// Registered calculator per measure, if the measure names one.
    percentage_calculators: Vec<Option<PercentageCalculator>>,
    row_orderings: Vec<BucketOrdering>,
    column_orderings: Vec<BucketOrdering>,
    cells: ResolvedCellMatrix,
    row_axis: AxisIndex,
    column_axis: AxisIndex,
    base: FxHashMap<(LeafId, LeafId), Vec<AggregationCell>>,
    rows_seen: u64,
}

impl<'a> CrosstabAccumulator<'a> {
    /// Validates the definition and resolves every plugin id. Nothing is
    /// resolved lazily, so configuration errors surface before the first row.
    pub fn new(
        definition: &'a CrosstabDefinition,
        registry: &IncrementerRegistry,
    ) -> Result<Self, CrosstabError> {
        definition.validate()?;
        let cells = definition
            .cells
            .resolve(definition.row_group_count(), definition.column_group_count())?;

        let incrementers = definition
            .measures
            .iter()
            .map(|m| registry.resolve_incrementer(m))
            .collect::<Result<Vec<_>, _>>()?;
        let percentage_calculators = definition
            .measures
            .iter()
            .map(|m| registry.resolve_percentage_calculator(m))
            .collect::<Result<Vec<_>, _>>()?;
        let row_orderings = resolve_orderings(&definition.row_groups, registry)?;
        let column_orderings = resolve_orderings(&definition.column_groups, registry)?;

        debug!(
            "{}: {} with {} row groups, {} column groups, {} measures",
            crosstab_name(definition),
            FillPhase::Accumulating,
            definition.row_group_count(),
            definition.column_group_count(),
            definition.measures.len()
        );

        Ok(CrosstabAccumulator {
            definition,
            incrementers,
            percentage_calculators,
            row_orderings,
            column_orderings,
            cells,
            row_axis: AxisIndex::new(),
            column_axis: AxisIndex::new(),
            base: FxHashMap::default(),
            rows_seen: 0,
        })
    }

    pub fn phase(&self) -> FillPhase {
        FillPhase::Accumulating
    }

    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }

    /// Consumes one row.
    ///
    /// A bucket that cannot be evaluated is fatal, since the row has no place
    /// in the crosstab. A measure that cannot be evaluated or converted only
    /// marks its cell invalid.
    pub fn add_row<R, E>(&mut self, evaluator: &mut E, row: &R) -> Result<(), CrosstabError>
    where
        R: ?Sized,
        E: RowEvaluator<R>,
    {
        let definition = self.definition;
        let seq = self.rows_seen;

        let row_leaf = place(&mut self.row_axis, &definition.row_groups, evaluator, row, seq)?;
        let column_leaf = place(&mut self.column_axis, &definition.column_groups, evaluator, row, seq)?;

        let measure_count = definition.measures.len();
        let cells = self
            .base
            .entry((row_leaf, column_leaf))
            .or_insert_with(|| empty_cells(measure_count));

        for (index, measure) in definition.measures.iter().enumerate() {
            let outcome = evaluator
                .evaluate(row, &measure.expression)
                .map_err(|e| e.to_string())
                .and_then(|value| value.coerce(measure.value_kind).map_err(|e| e.to_string()));
            if let Err(reason) = &outcome {
                warn!("measure '{}' on row {}: {}", measure.name, seq, reason);
            }
            cells[index].fold(&self.incrementers[index], outcome, seq);
        }

        trace!("row {} -> ({}, {})", seq, row_leaf, column_leaf);
        self.rows_seen += 1;
        Ok(())
    }

    pub fn add_rows<'r, R, E, I>(&mut self, evaluator: &mut E, rows: I) -> Result<(), CrosstabError>
    where
        R: ?Sized + 'r,
        E: RowEvaluator<R>,
        I: IntoIterator<Item = &'r R>,
    {
        for row in rows {
            self.add_row(evaluator, row)?;
        }
        Ok(())
    }

    /// Orders both axes and computes every total.
    ///
    /// Nodes are numbered so that children come after their parents; walking
    /// both trees from the highest id down means every pair a total merges
    /// is already computed. Each pair is computed once.
    pub fn roll_up(self) -> Result<RolledUpCrosstab<'a>, CrosstabError> {
        let definition = self.definition;
        let row_tree = GroupTree::build(&self.row_axis, &definition.row_groups, &self.row_orderings)?;
        let column_tree =
            GroupTree::build(&self.column_axis, &definition.column_groups, &self.column_orderings)?;

        let incrementers = self.incrementers;
        let measure_count = incrementers.len();
        let mut base = self.base;
        let mut invalid_cells = 0;
        let mut totals: FxHashMap<(NodeId, NodeId), Vec<AggregationCell>> = FxHashMap::default();

        for r in (0..row_tree.len() as NodeId).rev() {
            let row_leaf = row_tree.is_leaf(r);
            for c in (0..column_tree.len() as NodeId).rev() {
                let column_leaf = column_tree.is_leaf(c);

                let cells = if row_leaf && column_leaf {
                    let leaves = row_tree
                        .node(r)
                        .and_then(|n| n.leaf)
                        .zip(column_tree.node(c).and_then(|n| n.leaf));
                    let cells = leaves.and_then(|key| base.remove(&key));
                    if let Some(cells) = &cells {
                        invalid_cells += cells.iter().filter(|cell| !cell.is_valid()).count();
                    }
                    cells
                } else {
                    let parts: Vec<(NodeId, NodeId)> = if !row_leaf {
                        row_tree.children(r).map(|child| (child, c)).collect()
                    } else {
                        column_tree.children(c).map(|child| (r, child)).collect()
                    };
                    merge_parts(&incrementers, &totals, &parts, measure_count)
                };

                if let Some(cells) = cells {
                    totals.insert((r, c), cells);
                }
            }
        }

        let stats = FillStats {
            rows: self.rows_seen,
            row_leaves: self.row_axis.len(),
            column_leaves: self.column_axis.len(),
            invalid_cells,
        };
        info!(
            "{}: {} {} rows into {}x{} leaves, {} cells, {} invalid",
            crosstab_name(definition),
            FillPhase::RolledUp,
            stats.rows,
            stats.row_leaves,
            stats.column_leaves,
            totals.len(),
            stats.invalid_cells
        );

        Ok(RolledUpCrosstab {
            definition,
            incrementers,
            percentage_calculators: self.percentage_calculators,
            row_tree,
            column_tree,
            cells: self.cells,
            totals,
            stats,
        })
    }
}

impl fmt::Debug for CrosstabAccumulator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrosstabAccumulator")
            .field("name", &self.definition.name)
            .field("rows_seen", &self.rows_seen)
            .field("row_leaves", &self.row_axis.len())
            .field("column_leaves", &self.column_axis.len())
            .finish()
    }
}

fn resolve_orderings(
    groups: &[GroupSpec],
    registry: &IncrementerRegistry,
) -> Result<Vec<BucketOrdering>, CrosstabError> {
    groups
        .iter()
        .map(|group| {
            let comparator = registry.resolve_comparator(group)?;
            Ok(BucketOrdering::for_bucket(&group.bucket, comparator))
        })
        .collect()
}

/// Evaluates a row's bucket path on one axis and interns it. Order keys are
/// only evaluated for paths not seen before.
fn place<R, E>(
    axis: &mut AxisIndex,
    groups: &[GroupSpec],
    evaluator: &mut E,
    row: &R,
    seq: u64,
) -> Result<LeafId, CrosstabError>
where
    R: ?Sized,
    E: RowEvaluator<R>,
{
    let bucket_error = |group: &GroupSpec, source: EvaluationError| CrosstabError::BucketEvaluation {
        group: group.name.clone(),
        row: seq,
        source,
    };

    let mut path = PathKey::with_capacity(groups.len());
    for group in groups {
        let expression = &group.bucket.expression;
        let value = evaluator
            .evaluate(row, expression)
            .and_then(|value| {
                value
                    .coerce(group.bucket.value_kind)
                    .map_err(|e| EvaluationError::new(expression.expression(), e.to_string()))
            })
            .map_err(|source| bucket_error(group, source))?;
        path.push(value);
    }

    if let Some(leaf) = axis.get(&path) {
        return Ok(leaf);
    }

    let mut order_keys = PathKey::with_capacity(groups.len());
    for group in groups {
        let key = match &group.bucket.order_key {
            Some(producer) => evaluator
                .evaluate(row, producer)
                .map_err(|source| bucket_error(group, source))?,
            None => Value::Null,
        };
        order_keys.push(key);
    }
    Ok(axis.insert(path, order_keys))
}

/// Merges the cells of `parts` into a new total, or `None` when no part was
/// reached by any row.
fn merge_parts(
    incrementers: &[Incrementer],
    totals: &FxHashMap<(NodeId, NodeId), Vec<AggregationCell>>,
    parts: &[(NodeId, NodeId)],
    measure_count: usize,
) -> Option<Vec<AggregationCell>> {
    let mut merged: Option<Vec<AggregationCell>> = None;
    for part in parts {
        if let Some(cells) = totals.get(part) {
            let target = merged.get_or_insert_with(|| empty_cells(measure_count));
            for ((into, from), incrementer) in target.iter_mut().zip(cells).zip(incrementers) {
                into.merge_from(incrementer, from);
            }
        }
    }
    merged
}

// ============================================================================
// ROLLED UP
// ============================================================================

/// Ordered trees with every total computed. Percentages are not available
/// until [`RolledUpCrosstab::resolve_percentages`].
pub struct RolledUpCrosstab<'a> {
    definition: &'a CrosstabDefinition,
    incrementers: Vec<Incrementer>,
    percentage_calculators: Vec<Option<PercentageCalculator>>,
    row_tree: GroupTree,
    column_tree: GroupTree,
    cells: ResolvedCellMatrix,
    totals: FxHashMap<(NodeId, NodeId), Vec<AggregationCell>>,
    stats: FillStats,
}

impl<'a> RolledUpCrosstab<'a> {
    pub fn phase(&self) -> FillPhase {
        FillPhase::RolledUp
    }

    pub fn row_tree(&self) -> &GroupTree {
        &self.row_tree
    }

    pub fn column_tree(&self) -> &GroupTree {
        &self.column_tree
    }

    pub fn stats(&self) -> FillStats {
        self.stats
    }

    /// Aggregation state of one measure at a node pair, or `None` when no row
    /// reached the pair.
    pub fn aggregation(&self, row: NodeId, column: NodeId, measure: usize) -> Option<&AggregationCell> {
        self.totals.get(&(row, column))?.get(measure)
    }

    pub fn value(&self, row: NodeId, column: NodeId, measure: usize) -> Value {
        let Some(incrementer) = self.incrementers.get(measure) else {
            return Value::Null;
        };
        match self.aggregation(row, column, measure) {
            Some(cell) => cell.value(incrementer),
            None => AggregationCell::new().value(incrementer),
        }
    }

    pub fn grand_total(&self, measure: usize) -> Value {
        self.value(self.row_tree.root(), self.column_tree.root(), measure)
    }

    /// Computes percentages of the grand total and freezes the result.
    pub fn resolve_percentages(self) -> CrosstabResult {
        let definition = self.definition;
        let name = crosstab_name(definition);
        let root = (self.row_tree.root(), self.column_tree.root());

        // Per measure: the grand total and how to divide by it, or `None`
        // when every percentage is undefined.
        let mut divisors: Vec<Option<(Value, PercentageCalculator)>> = Vec::new();
        for (index, measure) in definition.measures.iter().enumerate() {
            if measure.percentage_mode != PercentageMode::GrandTotal {
                divisors.push(None);
                continue;
            }
            let grand_total = self.totals.get(&root).and_then(|cells| cells.get(index));
            let divisor = match grand_total {
                Some(cell) if cell.is_valid() => {
                    let total = cell.value(&self.incrementers[index]);
                    let calculator = self.percentage_calculators[index]
                        .clone()
                        .or_else(|| PercentageCalculator::for_grand_total(&total));
                    calculator.map(|calculator| (total, calculator))
                }
                _ => None,
            };
            if divisor.is_none() {
                warn!("{}: measure '{}' has no usable grand total; percentages are undefined", name, measure.name);
            }
            divisors.push(divisor);
        }

        let measure_cell = |index: usize, cell: &AggregationCell| -> MeasureCell {
            let incrementer = &self.incrementers[index];
            let value = cell.value(incrementer);
            let status = match cell.error() {
                Some(reason) => CellStatus::Invalid(reason.to_string()),
                None => CellStatus::Valid,
            };
            let percentage = if definition.measures[index].percentage_mode != PercentageMode::GrandTotal {
                Percentage::NotApplicable
            } else {
                match (&divisors[index], &status) {
                    (Some((total, calculator)), CellStatus::Valid) => calculator.percentage(&value, total),
                    _ => Percentage::Undefined,
                }
            };
            MeasureCell {
                value,
                status,
                percentage,
            }
        };

        let empty_cell = AggregationCell::new();
        let empty = (0..definition.measures.len())
            .map(|index| measure_cell(index, &empty_cell))
            .collect();
        let values = self
            .totals
            .iter()
            .map(|(&key, cells)| {
                let resolved = cells
                    .iter()
                    .enumerate()
                    .map(|(index, cell)| measure_cell(index, cell))
                    .collect();
                (key, resolved)
            })
            .collect();

        debug!("{}: {}", name, FillPhase::PercentagesResolved);

        CrosstabResult::new(
            definition.clone(),
            self.row_tree,
            self.column_tree,
            self.cells,
            values,
            empty,
            self.stats,
        )
    }
}

impl fmt::Debug for RolledUpCrosstab<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolledUpCrosstab")
            .field("name", &self.definition.name)
            .field("row_nodes", &self.row_tree.len())
            .field("column_nodes", &self.column_tree.len())
            .field("stats", &self.stats)
            .finish()
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Runs a complete fill over `rows`.
/// This is the main entry point for the crosstab engine.
pub fn fill_crosstab<'r, R, E, I>(
    definition: &CrosstabDefinition,
    registry: &IncrementerRegistry,
    evaluator: &mut E,
    rows: I,
) -> Result<CrosstabResult, CrosstabError>
where
    R: ?Sized + 'r,
    E: RowEvaluator<R>,
    I: IntoIterator<Item = &'r R>,
{
    let mut accumulator = CrosstabAccumulator::new(definition, registry)?;
    accumulator.add_rows(evaluator, rows)?;
    Ok(accumulator.roll_up()?.resolve_percentages())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{BucketSpec, CalculationKind, GroupSpec, MeasureSpec};
    use crate::evaluator::RecordEvaluator;
    use crate::matrix::{CellDefinition, TotalLevel};
    use crate::value::ValueKind;

    fn create_test_definition() -> CrosstabDefinition {
        let mut def = CrosstabDefinition::new();
        def.name = Some("sales".to_string());
        def.row_groups.push(GroupSpec::new("Country", BucketSpec::new("country", ValueKind::Text)));
        def.column_groups.push(GroupSpec::new("Year", BucketSpec::new("year", ValueKind::Integer)));
        def.measures.push(MeasureSpec::new("Amount", "amount", ValueKind::Integer, CalculationKind::Sum));
        def.cells.set(TotalLevel::Base, TotalLevel::Base, CellDefinition::new("amount", 60, 20));
        def
    }

    fn create_test_rows() -> Vec<Vec<Value>> {
        vec![
            vec![Value::text("US"), Value::Integer(2020), Value::Integer(10)],
            vec![Value::text("US"), Value::Integer(2021), Value::Integer(5)],
            vec![Value::text("FR"), Value::Integer(2020), Value::Integer(7)],
        ]
    }

    fn evaluator() -> RecordEvaluator {
        RecordEvaluator::new(["country", "year", "amount"])
    }

    fn accumulate<'a>(def: &'a CrosstabDefinition, rows: &[Vec<Value>]) -> CrosstabAccumulator<'a> {
        let mut acc = CrosstabAccumulator::new(def, &IncrementerRegistry::new()).unwrap();
        acc.add_rows(&mut evaluator(), rows).unwrap();
        acc
    }

    #[test]
    fn test_base_cells_and_totals() {
        let def = create_test_definition();
        let rolled = accumulate(&def, &create_test_rows()).roll_up().unwrap();
        let rows = rolled.row_tree();
        let cols = rolled.column_tree();

        let us = rows.find(&[Value::text("US")]).unwrap();
        let fr = rows.find(&[Value::text("FR")]).unwrap();
        let y2020 = cols.find(&[Value::Integer(2020)]).unwrap();
        let y2021 = cols.find(&[Value::Integer(2021)]).unwrap();

        assert_eq!(rolled.value(us, y2020, 0), Value::Integer(10));
        assert_eq!(rolled.value(us, y2021, 0), Value::Integer(5));
        assert_eq!(rolled.value(fr, y2020, 0), Value::Integer(7));
        assert_eq!(rolled.value(fr, y2021, 0), Value::Null);
        assert_eq!(rolled.value(us, cols.root(), 0), Value::Integer(15));
        assert_eq!(rolled.value(rows.root(), y2020, 0), Value::Integer(17));
        assert_eq!(rolled.grand_total(0), Value::Integer(22));
        assert_eq!(rolled.stats().rows, 3);
        assert_eq!(rolled.phase(), FillPhase::RolledUp);
    }

    #[test]
    fn test_unresolved_plugin_fails_before_rows() {
        let mut def = create_test_definition();
        def.measures[0].incrementer_id = Some("median".to_string());
        let err = CrosstabAccumulator::new(&def, &IncrementerRegistry::new()).unwrap_err();
        assert!(matches!(err, CrosstabError::UnresolvedIncrementer { .. }));

        let mut def = create_test_definition();
        def.row_groups[0].bucket.comparator = Some("calendar".to_string());
        let err = CrosstabAccumulator::new(&def, &IncrementerRegistry::new()).unwrap_err();
        assert!(matches!(err, CrosstabError::UnresolvedComparator { .. }));
    }

    #[test]
    fn test_bucket_failure_is_fatal() {
        let def = create_test_definition();
        let mut acc = CrosstabAccumulator::new(&def, &IncrementerRegistry::new()).unwrap();
        let row = vec![Value::text("US"), Value::text("not a year"), Value::Integer(1)];
        let err = acc.add_row(&mut evaluator(), &row).unwrap_err();
        assert!(matches!(err, CrosstabError::BucketEvaluation { ref group, row: 0, .. } if group == "Year"));
    }

    #[test]
    fn test_measure_failure_invalidates_only_its_cell() {
        let def = create_test_definition();
        let mut rows = create_test_rows();
        rows.push(vec![Value::text("FR"), Value::Integer(2021), Value::text("n/a")]);
        rows.push(vec![Value::text("FR"), Value::Integer(2021), Value::Integer(4)]);
        let rolled = accumulate(&def, &rows).roll_up().unwrap();
        let rows_tree = rolled.row_tree();
        let cols = rolled.column_tree();
        let fr = rows_tree.find(&[Value::text("FR")]).unwrap();
        let y2021 = cols.find(&[Value::Integer(2021)]).unwrap();
        let us = rows_tree.find(&[Value::text("US")]).unwrap();

        assert!(!rolled.aggregation(fr, y2021, 0).unwrap().is_valid());
        assert_eq!(rolled.value(fr, y2021, 0), Value::Null);
        // Totals keep the values that converted.
        assert!(rolled.aggregation(fr, cols.root(), 0).unwrap().is_valid());
        assert_eq!(rolled.value(fr, cols.root(), 0), Value::Integer(11));
        assert_eq!(rolled.value(rows_tree.root(), y2021, 0), Value::Integer(9));
        assert_eq!(rolled.grand_total(0), Value::Integer(26));
        assert_eq!(rolled.value(us, cols.root(), 0), Value::Integer(15));
        assert_eq!(rolled.stats().invalid_cells, 1);
    }

    #[test]
    fn test_measure_failure_keeps_percentages_defined() {
        let mut def = create_test_definition();
        def.measures[0].percentage_mode = PercentageMode::GrandTotal;
        let mut rows = create_test_rows();
        rows.push(vec![Value::text("FR"), Value::Integer(2021), Value::text("oops")]);
        let result = accumulate(&def, &rows).roll_up().unwrap().resolve_percentages();

        let grand = result.grand_total(0).unwrap();
        assert_eq!(grand.value, Value::Integer(22));
        assert!(grand.status.is_valid());
        assert_eq!(grand.percentage, Percentage::Defined(Value::number(1.0)));

        let us = result.value_at(&[Value::text("US")], &[Value::Integer(2020)], "Amount").unwrap();
        assert_eq!(us.percentage, Percentage::Defined(Value::number(0.4545)));

        let bad = result.value_at(&[Value::text("FR")], &[Value::Integer(2021)], "Amount").unwrap();
        assert!(!bad.status.is_valid());
        assert_eq!(bad.percentage, Percentage::Undefined);
    }

    #[test]
    fn test_percentages() {
        let mut def = create_test_definition();
        def.measures[0].percentage_mode = PercentageMode::GrandTotal;
        let result = accumulate(&def, &create_test_rows())
            .roll_up()
            .unwrap()
            .resolve_percentages();

        let grand = result.grand_total(0).unwrap();
        assert_eq!(grand.percentage, Percentage::Defined(Value::number(1.0)));
        let us = result.value_at(&[Value::text("US")], &[], "Amount").unwrap();
        assert_eq!(us.percentage, Percentage::Defined(Value::number(0.6818)));
    }

    #[test]
    fn test_zero_grand_total_leaves_percentages_undefined() {
        let mut def = create_test_definition();
        def.measures[0].percentage_mode = PercentageMode::GrandTotal;
        let rows = vec![
            vec![Value::text("US"), Value::Integer(2020), Value::Integer(3)],
            vec![Value::text("FR"), Value::Integer(2020), Value::Integer(-3)],
        ];
        let result = accumulate(&def, &rows).roll_up().unwrap().resolve_percentages();
        assert_eq!(result.grand_total(0).unwrap().percentage, Percentage::Undefined);
        let us = result.value_at(&[Value::text("US")], &[Value::Integer(2020)], "Amount").unwrap();
        assert_eq!(us.value, Value::Integer(3));
        assert_eq!(us.percentage, Percentage::Undefined);
    }

    #[test]
    fn test_empty_input() {
        let mut def = create_test_definition();
        def.measures.push(MeasureSpec::new("Rows", "amount", ValueKind::Integer, CalculationKind::Count));
        let result = fill_crosstab(&def, &IncrementerRegistry::new(), &mut evaluator(), &Vec::<Vec<Value>>::new())
            .unwrap();
        assert_eq!(result.row_tree().len(), 1);
        assert_eq!(result.grand_total(0).unwrap().value, Value::Null);
        assert_eq!(result.grand_total(1).unwrap().value, Value::Integer(0));
        assert_eq!(result.stats(), FillStats::default());
    }

    #[test]
    fn test_fill_phases_display() {
        assert_eq!(FillPhase::Accumulating.to_string(), "accumulating");
        assert_eq!(FillPhase::PercentagesResolved.to_string(), "percentages resolved");
    }
}
