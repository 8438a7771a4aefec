//! FILENAME: core/crosstab-engine/src/view.rs
//! Axis layout - flattens a group tree into display order.
//!
//! The layout stage renders one line (row or column) per entry. Members are
//! leaf nodes; total lines are inserted before or after a node's members
//! depending on the node's group settings. Headers describe which entries a
//! group value spans.

use serde::Serialize;

use crate::definition::{GroupSpec, TotalPosition};
use crate::tree::{GroupTree, NodeId};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisEntryKind {
    Member,
    Total,
}

/// One display line of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisEntry {
    pub node: NodeId,
    pub kind: AxisEntryKind,
    /// Cell-matrix level: the group count for members, the node depth for
    /// totals.
    pub total_level: usize,
}

/// A header cell for one group value or one total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderCell {
    /// Group index (0 = outermost).
    pub level: usize,
    pub node: NodeId,
    /// Null for total headers.
    pub value: Value,
    /// Header content reference from the group.
    pub content: Option<String>,
    /// First entry covered.
    pub start: usize,
    /// Number of entries covered.
    pub span: usize,
    /// Number of group levels covered. Total headers cover their own level
    /// and every nested one.
    pub depth_span: usize,
    pub is_total: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisLayout {
    pub entries: Vec<AxisEntry>,
    /// Sorted by level, then start.
    pub headers: Vec<HeaderCell>,
}

impl AxisLayout {
    pub fn build(tree: &GroupTree, groups: &[GroupSpec]) -> Self {
        let mut layout = AxisLayout::default();
        layout.visit(tree, groups, tree.root());
        layout.headers.sort_by_key(|h| (h.level, h.start));
        layout
    }

    /// Number of display lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Headers of one group level, in display order.
    pub fn headers_at(&self, level: usize) -> impl Iterator<Item = &HeaderCell> {
        self.headers.iter().filter(move |h| h.level == level)
    }

    fn visit(&mut self, tree: &GroupTree, groups: &[GroupSpec], id: NodeId) {
        let Some(node) = tree.node(id) else {
            return;
        };
        let start = self.entries.len();

        if tree.is_leaf(id) {
            self.entries.push(AxisEntry {
                node: id,
                kind: AxisEntryKind::Member,
                total_level: tree.group_count(),
            });
        } else {
            let total_position = groups
                .get(node.depth)
                .filter(|group| group.has_total)
                .map(|group| group.total_position);
            if total_position == Some(TotalPosition::Start) {
                self.push_total(id, node.depth, groups);
            }
            for child in tree.children(id) {
                self.visit(tree, groups, child);
            }
            if total_position == Some(TotalPosition::End) {
                self.push_total(id, node.depth, groups);
            }
        }

        // The root has no header of its own; its total is the grand total.
        if node.depth == 0 {
            return;
        }
        let level = node.depth - 1;
        let Some(group) = groups.get(level) else {
            return;
        };
        let end = self.entries.len();
        let header = |start: usize, span: usize| HeaderCell {
            level,
            node: id,
            value: node.value.clone(),
            content: group.header.clone(),
            start,
            span,
            depth_span: 1,
            is_total: false,
        };
        if group.merge_header_cells {
            self.headers.push(header(start, end - start));
        } else {
            for index in start..end {
                self.headers.push(header(index, 1));
            }
        }
    }

    fn push_total(&mut self, id: NodeId, depth: usize, groups: &[GroupSpec]) {
        self.headers.push(HeaderCell {
            level: depth,
            node: id,
            value: Value::Null,
            content: groups.get(depth).and_then(|g| g.total_header.clone()),
            start: self.entries.len(),
            span: 1,
            depth_span: groups.len().saturating_sub(depth),
            is_total: true,
        });
        self.entries.push(AxisEntry {
            node: id,
            kind: AxisEntryKind::Total,
            total_level: depth,
        });
    }
}
