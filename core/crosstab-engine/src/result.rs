//! FILENAME: core/crosstab-engine/src/result.rs
//! Crosstab Result - the finished, immutable output of a fill.
//!
//! Cells are addressed by a (row node, column node) pair. Any pair of nodes
//! is a valid address: leaf x leaf is a base cell, anything else a total.
//! Pairs that no row reached read as empty aggregations.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::definition::CrosstabDefinition;
use crate::matrix::{CellDefinition, ResolvedCellMatrix};
use crate::percentage::Percentage;
use crate::tree::{GroupTree, NodeId};
use crate::value::Value;
use crate::view::AxisLayout;

/// Whether a cell's value can be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CellStatus {
    Valid,
    /// A value failed to evaluate or convert; the cell reports null. Totals
    /// above it keep aggregating the values that did convert.
    Invalid(String),
}

impl CellStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CellStatus::Valid)
    }
}

/// One measure in one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureCell {
    pub value: Value,
    pub status: CellStatus,
    pub percentage: Percentage,
}

/// Counters collected during a fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillStats {
    pub rows: u64,
    pub row_leaves: usize,
    pub column_leaves: usize,
    /// Base measure cells marked invalid.
    pub invalid_cells: usize,
}

#[derive(Debug, Clone)]
pub struct CrosstabResult {
    definition: CrosstabDefinition,
    row_tree: GroupTree,
    column_tree: GroupTree,
    cells: ResolvedCellMatrix,
    values: FxHashMap<(NodeId, NodeId), Vec<MeasureCell>>,
    /// Per measure, what a cell no row reached reads as.
    empty: Vec<MeasureCell>,
    stats: FillStats,
}

impl CrosstabResult {
    pub(crate) fn new(
        definition: CrosstabDefinition,
        row_tree: GroupTree,
        column_tree: GroupTree,
        cells: ResolvedCellMatrix,
        values: FxHashMap<(NodeId, NodeId), Vec<MeasureCell>>,
        empty: Vec<MeasureCell>,
        stats: FillStats,
    ) -> Self {
        CrosstabResult {
            definition,
            row_tree,
            column_tree,
            cells,
            values,
            empty,
            stats,
        }
    }

    pub fn definition(&self) -> &CrosstabDefinition {
        &self.definition
    }

    pub fn row_tree(&self) -> &GroupTree {
        &self.row_tree
    }

    pub fn column_tree(&self) -> &GroupTree {
        &self.column_tree
    }

    pub fn cell_matrix(&self) -> &ResolvedCellMatrix {
        &self.cells
    }

    pub fn stats(&self) -> FillStats {
        self.stats
    }

    /// All measures of one cell, or `None` for an unknown node.
    pub fn cell(&self, row: NodeId, column: NodeId) -> Option<&[MeasureCell]> {
        if self.row_tree.node(row).is_none() || self.column_tree.node(column).is_none() {
            return None;
        }
        Some(
            self.values
                .get(&(row, column))
                .map_or(self.empty.as_slice(), |cells| cells.as_slice()),
        )
    }

    pub fn measure_cell(&self, row: NodeId, column: NodeId, measure: usize) -> Option<&MeasureCell> {
        self.cell(row, column)?.get(measure)
    }

    pub fn value(&self, row: NodeId, column: NodeId, measure: usize) -> Value {
        self.measure_cell(row, column, measure)
            .map_or(Value::Null, |cell| cell.value.clone())
    }

    pub fn percentage(&self, row: NodeId, column: NodeId, measure: usize) -> Percentage {
        self.measure_cell(row, column, measure)
            .map_or(Percentage::NotApplicable, |cell| cell.percentage.clone())
    }

    pub fn grand_total(&self, measure: usize) -> Option<&MeasureCell> {
        self.measure_cell(self.row_tree.root(), self.column_tree.root(), measure)
    }

    /// Row node at a bucket path. Shorter paths address totals; the empty
    /// path is the row grand total.
    pub fn find_row(&self, path: &[Value]) -> Option<NodeId> {
        self.row_tree.find(path)
    }

    pub fn find_column(&self, path: &[Value]) -> Option<NodeId> {
        self.column_tree.find(path)
    }

    /// A measure cell by row path, column path and measure name.
    pub fn value_at(&self, row_path: &[Value], column_path: &[Value], measure: &str) -> Option<&MeasureCell> {
        let measure = self.definition.measure_index(measure)?;
        self.measure_cell(self.find_row(row_path)?, self.find_column(column_path)?, measure)
    }

    /// Content definition of the cell at a node pair, after inheritance.
    pub fn cell_definition(&self, row: NodeId, column: NodeId) -> Option<&CellDefinition> {
        self.row_tree.node(row)?;
        self.column_tree.node(column)?;
        self.cells
            .get(self.row_tree.total_level(row), self.column_tree.total_level(column))
            .map(|cell| &cell.definition)
    }

    pub fn row_height(&self, row: NodeId) -> Option<u32> {
        self.row_tree.node(row)?;
        self.cells.row_height(self.row_tree.total_level(row))
    }

    pub fn column_width(&self, column: NodeId) -> Option<u32> {
        self.column_tree.node(column)?;
        self.cells.column_width(self.column_tree.total_level(column))
    }

    /// Display order of rows, including total rows and header spans.
    pub fn row_layout(&self) -> AxisLayout {
        AxisLayout::build(&self.row_tree, &self.definition.row_groups)
    }

    pub fn column_layout(&self) -> AxisLayout {
        AxisLayout::build(&self.column_tree, &self.definition.column_groups)
    }
}
