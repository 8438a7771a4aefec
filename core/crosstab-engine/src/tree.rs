//! FILENAME: core/crosstab-engine/src/tree.rs
//! Group trees - path interning during fill and ordered trees for roll-up.
//!
//! During accumulation each axis only interns full bucket paths (one leaf per
//! distinct path, in arrival order). After the last row the leaves are
//! arranged into an ordered tree, one level per group. Nodes live in an arena
//! and are numbered breadth-first, so a node's children occupy a contiguous
//! id range and every child id is greater than its parent's.

use std::collections::VecDeque;
use std::ops::Range;

use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::definition::GroupSpec;
use crate::error::CrosstabError;
use crate::ordering::{try_stable_sort, BucketOrdering};
use crate::value::Value;

/// Bucket values of one row on one axis, outermost group first.
pub type PathKey = SmallVec<[Value; 4]>;

/// Index of a distinct full path on one axis, in arrival order.
pub type LeafId = u32;

/// Index of a node in a [`GroupTree`]. The root is always 0.
pub type NodeId = u32;

// ============================================================================
// AXIS INDEX
// ============================================================================

/// Distinct full paths of one axis.
#[derive(Debug, Clone, Default)]
pub struct AxisIndex {
    leaves: FxHashMap<PathKey, LeafId>,
    paths: Vec<PathKey>,
    /// Per leaf, the order-key values of the row that created it.
    order_keys: Vec<PathKey>,
}

impl AxisIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &[Value]) -> Option<LeafId> {
        self.leaves.get(path).copied()
    }

    /// Interns a new path. `order_keys` holds one value per group (null where
    /// the group has no order key).
    pub fn insert(&mut self, path: PathKey, order_keys: PathKey) -> LeafId {
        if let Some(&leaf) = self.leaves.get(path.as_slice()) {
            return leaf;
        }
        let leaf = self.paths.len() as LeafId;
        trace!("new path {:?} -> leaf {}", path.as_slice(), leaf);
        self.leaves.insert(path.clone(), leaf);
        self.paths.push(path);
        self.order_keys.push(order_keys);
        leaf
    }

    pub fn path(&self, leaf: LeafId) -> Option<&[Value]> {
        self.paths.get(leaf as usize).map(|p| p.as_slice())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

// ============================================================================
// GROUP TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    /// Bucket value of this node's group (null for the root).
    pub value: Value,
    /// 0 for the root; equal to the group count for leaves.
    pub depth: usize,
    pub parent: Option<NodeId>,
    children: Range<NodeId>,
    /// Interned path of a leaf node.
    pub leaf: Option<LeafId>,
}

impl GroupNode {
    pub fn children(&self) -> Range<NodeId> {
        self.children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Ordered hierarchy of one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTree {
    nodes: Vec<GroupNode>,
    group_count: usize,
    /// Node of each leaf id.
    leaf_nodes: Vec<NodeId>,
}

impl GroupTree {
    /// Arranges interned paths into an ordered tree.
    ///
    /// Siblings are sorted by their group's ordering, comparing the order
    /// key of the group's first row when the bucket has one and the bucket
    /// value otherwise. Ties keep first-seen order.
    pub(crate) fn build(
        index: &AxisIndex,
        groups: &[GroupSpec],
        orderings: &[BucketOrdering],
    ) -> Result<Self, CrosstabError> {
        let group_count = groups.len();
        let mut nodes = vec![GroupNode {
            value: Value::Null,
            depth: 0,
            parent: None,
            children: 0..0,
            leaf: None,
        }];
        let mut leaf_nodes = vec![0; index.len()];

        let mut pending: VecDeque<(NodeId, Vec<LeafId>)> = VecDeque::new();
        pending.push_back((0, (0..index.len() as LeafId).collect()));

        while let Some((id, members)) = pending.pop_front() {
            let depth = nodes[id as usize].depth;
            if depth == group_count {
                if let Some(&leaf) = members.first() {
                    nodes[id as usize].leaf = Some(leaf);
                    leaf_nodes[leaf as usize] = id;
                }
                continue;
            }

            let partitions = partition(index, &members, depth);
            let group = &groups[depth];
            let ordering = &orderings[depth];
            let partitions = if ordering.is_sorted() {
                let use_order_key = group.bucket.order_key.is_some();
                let sort_key = |part: &(Value, Vec<LeafId>)| -> Value {
                    if use_order_key {
                        index.order_keys[part.1[0] as usize]
                            .get(depth)
                            .cloned()
                            .unwrap_or(Value::Null)
                    } else {
                        part.0.clone()
                    }
                };
                // The null group is placed by its own value, never by its order key.
                try_stable_sort(partitions, |a, b| {
                    if a.0.is_null() || b.0.is_null() {
                        ordering.compare(&a.0, &b.0)
                    } else {
                        ordering.compare(&sort_key(a), &sort_key(b))
                    }
                })
                    .map_err(|source| CrosstabError::Ordering {
                        group: group.name.clone(),
                        source,
                    })?
            } else {
                partitions
            };

            let start = nodes.len() as NodeId;
            let end = start + partitions.len() as NodeId;
            nodes[id as usize].children = start..end;
            for (offset, (value, leaves)) in partitions.into_iter().enumerate() {
                nodes.push(GroupNode {
                    value,
                    depth: depth + 1,
                    parent: Some(id),
                    children: 0..0,
                    leaf: None,
                });
                pending.push_back((start + offset as NodeId, leaves));
            }
        }

        Ok(GroupTree {
            nodes,
            group_count,
            leaf_nodes,
        })
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> Option<&GroupNode> {
        self.nodes.get(id as usize)
    }

    pub fn children(&self, id: NodeId) -> Range<NodeId> {
        self.node(id).map_or(0..0, |n| n.children())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Whether the node is at full depth (a base member, not a total).
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).map_or(false, |n| n.depth == self.group_count)
    }

    /// Cell-matrix level of a node: its depth. Leaves sit at the base level.
    pub fn total_level(&self, id: NodeId) -> usize {
        self.node(id).map_or(self.group_count, |n| n.depth)
    }

    pub fn leaf_node(&self, leaf: LeafId) -> Option<NodeId> {
        self.leaf_nodes.get(leaf as usize).copied()
    }

    /// Bucket values from the root down to `id`.
    pub fn path(&self, id: NodeId) -> PathKey {
        let mut path = PathKey::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            if node.parent.is_none() {
                break;
            }
            path.push(node.value.clone());
            current = node.parent.and_then(|p| self.node(p));
        }
        path.reverse();
        path
    }

    /// Node reached by following `path` from the root. An empty path is the
    /// root (the grand total).
    pub fn find(&self, path: &[Value]) -> Option<NodeId> {
        let mut id = self.root();
        for value in path {
            id = self
                .children(id)
                .find(|&child| self.nodes[child as usize].value == *value)?;
        }
        Some(id)
    }

    /// Leaf nodes in display order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        self.collect_leaves(self.root(), &mut leaves);
        leaves
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_leaf(id) {
            out.push(id);
            return;
        }
        for child in self.children(id) {
            self.collect_leaves(child, out);
        }
    }
}

/// Splits leaves by their value at `depth`, keeping first-seen order of the
/// values and arrival order within each part.
fn partition(index: &AxisIndex, members: &[LeafId], depth: usize) -> Vec<(Value, Vec<LeafId>)> {
    let mut positions: FxHashMap<&Value, usize> = FxHashMap::default();
    let mut parts: Vec<(Value, Vec<LeafId>)> = Vec::new();
    for &leaf in members {
        let value = &index.paths[leaf as usize][depth];
        let position = *positions.entry(value).or_insert_with(|| {
            parts.push((value.clone(), Vec::new()));
            parts.len() - 1
        });
        parts[position].1.push(leaf);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{BucketSpec, NullOrder, SortOrder};
    use crate::value::ValueKind;
    use smallvec::smallvec;

    fn create_test_groups(orders: &[SortOrder]) -> (Vec<GroupSpec>, Vec<BucketOrdering>) {
        let groups: Vec<GroupSpec> = orders
            .iter()
            .enumerate()
            .map(|(i, order)| {
                let mut bucket = BucketSpec::new(format!("g{}", i), ValueKind::Text);
                bucket.order = *order;
                GroupSpec::new(format!("G{}", i), bucket)
            })
            .collect();
        let orderings = groups
            .iter()
            .map(|g| BucketOrdering::for_bucket(&g.bucket, None))
            .collect();
        (groups, orderings)
    }

    fn index_of(paths: &[&[&str]]) -> AxisIndex {
        let mut index = AxisIndex::new();
        for path in paths {
            let key: PathKey = path.iter().map(|s| Value::text(*s)).collect();
            let nulls: PathKey = path.iter().map(|_| Value::Null).collect();
            index.insert(key, nulls);
        }
        index
    }

    fn child_values(tree: &GroupTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .map(|c| tree.node(c).unwrap().value.to_string())
            .collect()
    }

    #[test]
    fn test_interning_collapses_equal_paths() {
        let mut index = AxisIndex::new();
        let a = index.insert(smallvec![Value::text("US")], smallvec![Value::Null]);
        let b = index.insert(smallvec![Value::text("FR")], smallvec![Value::Null]);
        let again = index.insert(smallvec![Value::text("US")], smallvec![Value::Null]);
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&[Value::text("FR")]), Some(b));
    }

    #[test]
    fn test_nan_paths_collapse() {
        let mut index = AxisIndex::new();
        let a = index.insert(smallvec![Value::number(f64::NAN)], smallvec![Value::Null]);
        let b = index.insert(smallvec![Value::number(f64::NAN)], smallvec![Value::Null]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sorted_two_level_tree() {
        let index = index_of(&[&["US", "NY"], &["FR", "Paris"], &["US", "Boston"], &["FR", "Lyon"]]);
        let (groups, orderings) = create_test_groups(&[SortOrder::Ascending, SortOrder::Ascending]);
        let tree = GroupTree::build(&index, &groups, &orderings).unwrap();

        assert_eq!(child_values(&tree, tree.root()), vec!["FR", "US"]);
        let us = tree.find(&[Value::text("US")]).unwrap();
        assert_eq!(child_values(&tree, us), vec!["Boston", "NY"]);
        assert_eq!(tree.leaves().len(), 4);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn test_children_are_contiguous_and_after_parent() {
        let index = index_of(&[&["b", "x"], &["a", "y"], &["b", "z"]]);
        let (groups, orderings) = create_test_groups(&[SortOrder::Ascending, SortOrder::None]);
        let tree = GroupTree::build(&index, &groups, &orderings).unwrap();
        for id in 0..tree.len() as NodeId {
            for child in tree.children(id) {
                assert!(child > id);
                assert_eq!(tree.node(child).unwrap().parent, Some(id));
            }
        }
    }

    #[test]
    fn test_unordered_keeps_first_seen() {
        let index = index_of(&[&["c"], &["a"], &["b"]]);
        let (groups, orderings) = create_test_groups(&[SortOrder::None]);
        let tree = GroupTree::build(&index, &groups, &orderings).unwrap();
        assert_eq!(child_values(&tree, tree.root()), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_order_key_uses_first_seen_value() {
        let mut index = AxisIndex::new();
        // Month names ordered by month number.
        index.insert(smallvec![Value::text("Mar")], smallvec![Value::Integer(3)]);
        index.insert(smallvec![Value::text("Jan")], smallvec![Value::Integer(1)]);
        index.insert(smallvec![Value::text("Feb")], smallvec![Value::Integer(2)]);

        let mut bucket = BucketSpec::new("month", ValueKind::Text);
        bucket.order_key = Some(crate::definition::ValueProducer::new("month_no"));
        let groups = vec![GroupSpec::new("Month", bucket)];
        let orderings = vec![BucketOrdering::for_bucket(&groups[0].bucket, None)];
        let tree = GroupTree::build(&index, &groups, &orderings).unwrap();
        assert_eq!(child_values(&tree, tree.root()), vec!["Jan", "Feb", "Mar"]);
    }

    #[test]
    fn test_null_group_placement() {
        let mut index = AxisIndex::new();
        index.insert(smallvec![Value::text("b")], smallvec![Value::Null]);
        index.insert(smallvec![Value::Null], smallvec![Value::Null]);
        index.insert(smallvec![Value::text("a")], smallvec![Value::Null]);

        let (groups, _) = create_test_groups(&[SortOrder::Descending]);
        let last = vec![BucketOrdering::new(SortOrder::Descending, NullOrder::Last, None)];
        let tree = GroupTree::build(&index, &groups, &last).unwrap();
        assert_eq!(child_values(&tree, tree.root()), vec!["b", "a", "(null)"]);
    }

    #[test]
    fn test_null_group_ignores_its_order_key() {
        let mut index = AxisIndex::new();
        index.insert(smallvec![Value::text("Jan")], smallvec![Value::Integer(1)]);
        index.insert(smallvec![Value::Null], smallvec![Value::Integer(99)]);
        index.insert(smallvec![Value::text("Feb")], smallvec![Value::Integer(2)]);

        let mut bucket = BucketSpec::new("month", ValueKind::Text);
        bucket.order_key = Some(crate::definition::ValueProducer::new("month_no"));
        let groups = vec![GroupSpec::new("Month", bucket)];

        let first = vec![BucketOrdering::new(SortOrder::Ascending, NullOrder::First, None)];
        let tree = GroupTree::build(&index, &groups, &first).unwrap();
        assert_eq!(child_values(&tree, tree.root()), vec!["(null)", "Jan", "Feb"]);

        let last = vec![BucketOrdering::new(SortOrder::Descending, NullOrder::Last, None)];
        let tree = GroupTree::build(&index, &groups, &last).unwrap();
        assert_eq!(child_values(&tree, tree.root()), vec!["Feb", "Jan", "(null)"]);
    }

    #[test]
    fn test_paths_and_levels() {
        let index = index_of(&[&["US", "NY"]]);
        let (groups, orderings) = create_test_groups(&[SortOrder::Ascending, SortOrder::Ascending]);
        let tree = GroupTree::build(&index, &groups, &orderings).unwrap();
        let ny = tree.find(&[Value::text("US"), Value::text("NY")]).unwrap();

        assert!(tree.is_leaf(ny));
        assert_eq!(tree.total_level(ny), 2);
        assert_eq!(tree.total_level(tree.root()), 0);
        assert_eq!(tree.path(ny).as_slice(), &[Value::text("US"), Value::text("NY")]);
        assert_eq!(tree.leaf_node(0), Some(ny));
        assert_eq!(tree.find(&[Value::text("FR")]), None);
        assert_eq!(tree.find(&[]), Some(tree.root()));
    }

    #[test]
    fn test_axis_without_groups() {
        let index = index_of(&[&[]]);
        let tree = GroupTree::build(&index, &[], &[]).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_leaf(tree.root()));
        assert_eq!(tree.node(tree.root()).unwrap().leaf, Some(0));
    }

    #[test]
    fn test_comparator_fault_names_group() {
        use crate::error::ComparatorFault;
        use crate::ordering::BucketComparator;
        use std::cmp::Ordering;
        use std::sync::Arc;

        let index = index_of(&[&["x"], &["y"]]);
        let (groups, _) = create_test_groups(&[SortOrder::Ascending]);
        let faulty: Arc<dyn BucketComparator> =
            Arc::new(|_: &Value, _: &Value| -> Result<Ordering, ComparatorFault> {
                Err(ComparatorFault::new("unsupported"))
            });
        let orderings = vec![BucketOrdering::new(SortOrder::Ascending, NullOrder::First, Some(faulty))];
        let err = GroupTree::build(&index, &groups, &orderings).unwrap_err();
        assert!(matches!(err, CrosstabError::Ordering { ref group, .. } if group == "G0"));
    }
}
