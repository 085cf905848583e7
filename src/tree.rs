//! Component E — the dissection tree.
//!
//! `proto.c`'s `proto_tree`/`proto_node`/`field_info` triad
//! (`examples/original_source/epan/proto.c`) is an intrusive, manually
//! memory-managed n-ary tree. We model the same ordered-n-ary-with-side-data
//! shape as an arena (`Vec<NodeSlot>` addressed by [`NodeId`]) instead of
//! `Rc<RefCell<_>>` pointers: the builder only ever needs to append under a
//! parent it already holds a stable id for, which an arena gives for free
//! without interior mutability or unsafe code. Destruction is the arena's
//! `Vec` drop — Rust needs no equivalent of proto.c's explicit push/pop
//! free-the-subtree walk; the interesting-field index and its lists
//! are owned by `TreeData` and go with it.

use crate::value::Value;
use ahash::AHashMap;

/// Stable reference to a node in a [`Tree`]'s arena. `ROOT` is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// `tree_type` sentinel meaning "no children permitted".
pub const NO_SUBTREE: i32 = -1;

/// One decoded field instance.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub hfi: i32,
    pub start: usize,
    pub length: usize,
    pub tree_type: i32,
    pub visible: bool,
    pub value: Value,
    pub representation: Option<String>,
    pub ds_tvb: u64,
}

struct NodeSlot {
    fi: Option<FieldInfo>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Root-only side data: tree-wide visibility default and the interesting-
/// field index.
pub struct TreeData {
    pub visible: bool,
    interesting: AHashMap<i32, Vec<NodeId>>,
}

/// A rooted, ordered n-ary tree of field nodes, built incrementally by a
/// single dissection. The root carries no [`FieldInfo`].
pub struct Tree {
    nodes: Vec<NodeSlot>,
    pub data: TreeData,
}

impl Tree {
    /// A fresh tree with only the root node. Visibility defaults to
    /// `false` — consumers must opt in.
    pub fn new() -> Self {
        Tree {
            nodes: vec![NodeSlot {
                fi: None,
                children: Vec::new(),
                parent: None,
            }],
            data: TreeData {
                visible: false,
                interesting: AHashMap::new(),
            },
        }
    }

    /// Install an empty interesting-field list for `handle`; subsequent
    /// adds of that handle are indexed.
    pub fn prime(&mut self, handle: i32) {
        self.data.interesting.entry(handle).or_default();
    }

    /// The indexed field-info list for a primed handle, in tree order, or
    /// `None` if `handle` was never primed.
    pub fn interesting(&self, handle: i32) -> Option<Vec<&FieldInfo>> {
        self.data.interesting.get(&handle).map(|ids| {
            ids.iter()
                .filter_map(|&id| self.get(id).fi.as_ref())
                .collect()
        })
    }

    fn get(&self, id: NodeId) -> &NodeSlot {
        &self.nodes[id.0]
    }

    /// Append `fi` as the last child of `parent`.
    ///
    /// # Panics
    /// If `parent` is neither the root nor a node whose own `FieldInfo` was
    /// previously marked expandable via [`Tree::mark_subtree`] — appending
    /// under a leaf is a programming error.
    pub fn append_child(&mut self, parent: NodeId, fi: FieldInfo) -> NodeId {
        assert!(
            parent == NodeId::ROOT || self.get(parent).fi.as_ref().is_some_and(|f| f.tree_type != NO_SUBTREE),
            "cannot append a field under a non-expandable parent"
        );

        let hfi = fi.hfi;
        let child_id = NodeId(self.nodes.len());
        self.nodes.push(NodeSlot {
            fi: Some(fi),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(child_id);

        if let Some(list) = self.data.interesting.get_mut(&hfi) {
            list.push(child_id);
        }

        child_id
    }

    /// Mark `node` as expandable with the given subtree type, permitting
    /// children to be appended under it (`proto_item_add_subtree`).
    pub fn mark_subtree(&mut self, node: NodeId, subtree_type: i32) {
        if let Some(fi) = self.nodes[node.0].fi.as_mut() {
            fi.tree_type = subtree_type;
        }
    }

    pub fn field_info(&self, node: NodeId) -> Option<&FieldInfo> {
        self.get(node).fi.as_ref()
    }

    pub fn field_info_mut(&mut self, node: NodeId) -> Option<&mut FieldInfo> {
        self.nodes[node.0].fi.as_mut()
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(node).children.iter().copied()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).parent
    }

    /// Pre-order walk yielding every node's `FieldInfo`, in child-append
    /// order at each level.
    pub fn iter_preorder(&self) -> impl Iterator<Item = (NodeId, &FieldInfo)> {
        let mut stack: Vec<NodeId> = self.get(NodeId::ROOT).children.iter().rev().copied().collect();
        std::iter::from_fn(move || loop {
            let id = stack.pop()?;
            let slot = self.get(id);
            for &child in slot.children.iter().rev() {
                stack.push(child);
            }
            if let Some(fi) = slot.fi.as_ref() {
                return Some((id, fi));
            }
        })
    }

    /// Last visible FI (by pre-order walk) whose `[start, start+length)`
    /// contains `offset`, restricted to nodes sharing `ds_tvb`.
    pub fn lookup_by_offset(&self, ds_tvb: u64, offset: usize) -> Option<(NodeId, &FieldInfo)> {
        self.iter_preorder()
            .filter(|(_, fi)| fi.visible && fi.ds_tvb == ds_tvb)
            .filter(|(_, fi)| offset >= fi.start && offset < fi.start + fi.length)
            .last()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn leaf(hfi: i32, start: usize, length: usize) -> FieldInfo {
        FieldInfo {
            hfi,
            start,
            length,
            tree_type: NO_SUBTREE,
            visible: true,
            value: Value::None,
            representation: None,
            ds_tvb: 1,
        }
    }

    #[test]
    fn child_order_matches_append_order() {
        let mut tree = Tree::new();
        let a = tree.append_child(NodeId::ROOT, leaf(1, 0, 1));
        let b = tree.append_child(NodeId::ROOT, leaf(2, 1, 1));
        let c = tree.append_child(NodeId::ROOT, leaf(3, 2, 1));
        let order: Vec<NodeId> = tree.children(NodeId::ROOT).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    #[should_panic(expected = "non-expandable parent")]
    fn appending_under_a_leaf_panics() {
        let mut tree = Tree::new();
        let leaf_id = tree.append_child(NodeId::ROOT, leaf(1, 0, 1));
        tree.append_child(leaf_id, leaf(2, 1, 1));
    }

    #[test]
    fn appending_under_a_marked_subtree_is_allowed() {
        let mut tree = Tree::new();
        let parent = tree.append_child(NodeId::ROOT, leaf(1, 0, 4));
        tree.mark_subtree(parent, 0);
        let child = tree.append_child(parent, leaf(2, 0, 1));
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![child]);
    }

    #[test]
    fn interesting_field_index_is_exact_and_ordered() {
        let mut tree = Tree::new();
        tree.prime(7);
        tree.append_child(NodeId::ROOT, leaf(7, 0, 1));
        tree.append_child(NodeId::ROOT, leaf(8, 1, 1));
        tree.append_child(NodeId::ROOT, leaf(7, 2, 1));

        let hits = tree.interesting(7).unwrap();
        let starts: Vec<usize> = hits.iter().map(|fi| fi.start).collect();
        assert_eq!(starts, vec![0, 2]);
        assert!(tree.interesting(9).is_none());
    }

    #[test]
    fn offset_lookup_returns_last_matching_visible_field() {
        let mut tree = Tree::new();
        tree.append_child(NodeId::ROOT, leaf(1, 0, 4));
        let inner = tree.append_child(NodeId::ROOT, leaf(2, 1, 2));
        assert_eq!(tree.lookup_by_offset(1, 1).unwrap().0, inner);
        assert!(tree.lookup_by_offset(2, 1).is_none());
    }
}
