//! FILENAME: core/crosstab-engine/src/matrix.rs
//! Cell Matrix - content definitions for base, total and grand-total cells.
//!
//! A crosstab with R row groups and C column groups renders at most
//! (R+1) x (C+1) kinds of cells: on each axis either one group level is in
//! total mode or none is. Definitions are configured sparsely and the missing
//! slots inherit from the more specific level:
//!
//! - slot (r, c) undefined: take (r+1, c) if it is defined, else (r, c+1)
//!   if it is defined
//! - neither neighbour defined: take the resolved slot (r+1, c), or
//!   (R, c+1) on the base row
//! - slot (R, C), the base cell, must always be defined
//!
//! Sizes travel with the content, so an inherited total row is as tall as
//! the row it borrowed from.

use serde::{Deserialize, Serialize};

use crate::error::CrosstabError;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Address of one matrix axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TotalLevel {
    /// The total of the group at this index (0 = outermost = grand total).
    Total(usize),
    /// No total active on this axis.
    Base,
}

impl TotalLevel {
    /// Numeric slot index, where `group_count` is the base level.
    pub fn index(self, group_count: usize) -> usize {
        match self {
            TotalLevel::Total(i) => i,
            TotalLevel::Base => group_count,
        }
    }

    /// Inverse of [`TotalLevel::index`].
    pub fn from_index(index: usize, group_count: usize) -> Self {
        if index >= group_count {
            TotalLevel::Base
        } else {
            TotalLevel::Total(index)
        }
    }
}

/// Content and size of one kind of cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDefinition {
    /// Reference to the content template rendered by the layout stage.
    pub content: String,
    pub width: u32,
    pub height: u32,
}

impl CellDefinition {
    pub fn new(content: impl Into<String>, width: u32, height: u32) -> Self {
        CellDefinition {
            content: content.into(),
            width,
            height,
        }
    }
}

/// One configured slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEntry {
    pub row: TotalLevel,
    pub column: TotalLevel,
    pub definition: CellDefinition,
}

/// Sparse cell configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellMatrix {
    #[serde(default)]
    pub entries: Vec<CellEntry>,
}

impl CellMatrix {
    /// Defines (or redefines) the slot at `(row, column)`.
    pub fn set(&mut self, row: TotalLevel, column: TotalLevel, definition: CellDefinition) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.row == row && e.column == column)
        {
            entry.definition = definition;
        } else {
            self.entries.push(CellEntry { row, column, definition });
        }
    }

    pub fn get(&self, row: TotalLevel, column: TotalLevel) -> Option<&CellDefinition> {
        self.entries
            .iter()
            .find(|e| e.row == row && e.column == column)
            .map(|e| &e.definition)
    }

    /// Resolves every slot for the given group counts.
    pub fn resolve(
        &self,
        row_groups: usize,
        column_groups: usize,
    ) -> Result<ResolvedCellMatrix, CrosstabError> {
        let rows = row_groups + 1;
        let columns = column_groups + 1;
        let mut defined: Vec<Option<&CellDefinition>> = vec![None; rows * columns];

        for entry in &self.entries {
            let r = entry.row.index(row_groups);
            let c = entry.column.index(column_groups);
            let out_of_range = matches!(entry.row, TotalLevel::Total(i) if i >= row_groups)
                || matches!(entry.column, TotalLevel::Total(i) if i >= column_groups);
            if out_of_range {
                return Err(CrosstabError::CellOutOfRange {
                    row: entry.row,
                    column: entry.column,
                    row_groups,
                    column_groups,
                });
            }
            let slot = &mut defined[r * columns + c];
            if slot.is_some() {
                return Err(CrosstabError::DuplicateCell {
                    row: entry.row,
                    column: entry.column,
                });
            }
            *slot = Some(&entry.definition);
        }

        if defined[rows * columns - 1].is_none() {
            return Err(CrosstabError::MissingBaseCell);
        }

        // Resolve from the base slot outwards so every fallback target is
        // already final when it is borrowed.
        let mut slots: Vec<Option<ResolvedCell>> = vec![None; rows * columns];
        for r in (0..rows).rev() {
            for c in (0..columns).rev() {
                let resolved = match defined[r * columns + c] {
                    Some(definition) => ResolvedCell {
                        definition: definition.clone(),
                        origin: (r, c),
                    },
                    None => {
                        let row_child = (r + 1 < rows).then(|| (r + 1) * columns + c);
                        let column_child = (c + 1 < columns).then(|| r * columns + c + 1);
                        let is_defined = |slot: &Option<usize>| slot.map_or(false, |i| defined[i].is_some());
                        let source = if is_defined(&row_child) {
                            row_child
                        } else if is_defined(&column_child) {
                            column_child
                        } else {
                            row_child.or(column_child)
                        };
                        match source.and_then(|i| slots[i].as_ref()) {
                            Some(cell) => cell.clone(),
                            None => return Err(CrosstabError::MissingBaseCell),
                        }
                    }
                };
                slots[r * columns + c] = Some(resolved);
            }
        }

        Ok(ResolvedCellMatrix {
            rows,
            columns,
            slots: slots.into_iter().flatten().collect(),
        })
    }
}

// ============================================================================
// RESOLVED MATRIX
// ============================================================================

/// A slot after inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCell {
    pub definition: CellDefinition,
    /// Numeric `(row, column)` slot the definition came from.
    pub origin: (usize, usize),
}

/// Dense (R+1) x (C+1) matrix with every slot filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCellMatrix {
    rows: usize,
    columns: usize,
    slots: Vec<ResolvedCell>,
}

impl ResolvedCellMatrix {
    /// Number of row levels (row groups + 1).
    pub fn row_levels(&self) -> usize {
        self.rows
    }

    /// Number of column levels (column groups + 1).
    pub fn column_levels(&self) -> usize {
        self.columns
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot at numeric total levels.
    pub fn get(&self, row_level: usize, column_level: usize) -> Option<&ResolvedCell> {
        if row_level >= self.rows || column_level >= self.columns {
            return None;
        }
        self.slots.get(row_level * self.columns + column_level)
    }

    /// Whether the slot borrowed its definition from another slot.
    pub fn is_inherited(&self, row_level: usize, column_level: usize) -> bool {
        self.get(row_level, column_level)
            .map_or(false, |cell| cell.origin != (row_level, column_level))
    }

    /// Height of rows at a row total level, taken from the column-base slot.
    pub fn row_height(&self, row_level: usize) -> Option<u32> {
        self.get(row_level, self.columns - 1)
            .map(|cell| cell.definition.height)
    }

    /// Width of columns at a column total level, taken from the row-base slot.
    pub fn column_width(&self, column_level: usize) -> Option<u32> {
        self.get(self.rows - 1, column_level)
            .map(|cell| cell.definition.width)
    }
}
