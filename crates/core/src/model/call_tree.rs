use std::collections::HashMap;

use hotspot_protocol::SharedStr;
use serde::Serialize;
use tracing::warn;

use super::identity::NodeIdentity;
use super::sample::SampleFrame;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Aggregated call tree node.
/// Every sampled path through the same `(file, name, line)` chain lands here.
#[derive(Debug, Clone, Serialize)]
pub struct CallTreeNode {
    pub id: NodeId,
    /// Record-local id of the frame that created this node. Not an identity.
    pub self_id: u64,
    pub identity: NodeIdentity,
    /// Samples where this node was the running function.
    pub self_ticks: u64,
    /// Sum of `self_ticks` over everything strictly below this node.
    pub descendant_ticks: u64,
    pub parent: Option<NodeId>,
    /// In creation order.
    pub children: Vec<NodeId>,
    pub depth: u32,
}

/// A call tree built by merging sample paths.
///
/// Nodes live in a flat arena and refer to each other by [`NodeId`], so
/// parent back-links never own anything. Nodes are never removed or moved
/// once created, and tick counts only grow.
#[derive(Debug, Clone, Serialize)]
pub struct CallTree {
    nodes: Vec<CallTreeNode>,
    files: HashMap<SharedStr, Vec<NodeId>>,
    max_depth: u32,
}

impl CallTree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            files: HashMap::new(),
            max_depth: 0,
        };
        tree.push_node(None, 0, NodeIdentity::root());
        tree
    }

    pub fn root(&self) -> &CallTreeNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Grand total of every tick merged below the root.
    pub fn total_ticks(&self) -> u64 {
        self.root().descendant_ticks
    }

    pub fn node(&self, id: NodeId) -> Option<&CallTreeNode> {
        self.nodes.get(id.0)
    }

    /// All nodes in creation order, root first.
    pub fn nodes(&self) -> &[CallTreeNode] {
        &self.nodes
    }

    pub fn parent(&self, id: NodeId) -> Option<&CallTreeNode> {
        self.node(id)?.parent.and_then(|p| self.node(p))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of distinct source files with at least one node.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Nodes whose frame lives in `file`, in creation order.
    pub fn nodes_for_file<'a>(
        &'a self,
        file: &str,
    ) -> impl Iterator<Item = &'a CallTreeNode> + use<'a> {
        self.files
            .get(file)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.node(*id))
    }

    /// Add `ticks` to a node's self count and to every strict ancestor's
    /// descendant count. Counts saturate at `u64::MAX`.
    pub fn add_ticks(&mut self, id: NodeId, ticks: u64) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        node.self_ticks = node.self_ticks.saturating_add(ticks);
        let mut next = node.parent;
        while let Some(pid) = next {
            let Some(ancestor) = self.nodes.get_mut(pid.0) else {
                break;
            };
            ancestor.descendant_ticks = ancestor.descendant_ticks.saturating_add(ticks);
            next = ancestor.parent;
        }
    }

    /// Merge one root-first sample path into the tree and credit `ticks` to
    /// the node at its leaf. Returns that node, or `None` for an empty path.
    ///
    /// A path consisting of the root frame alone credits the root itself.
    /// A path whose first frame is not the root is still merged, starting
    /// from the tree's root with that first frame as a top-level child.
    pub fn merge_sample(&mut self, path: &[&SampleFrame], ticks: u64) -> Option<NodeId> {
        let (first, leaf) = (path.first()?, path.last()?);

        if leaf.identity.is_root() {
            self.add_ticks(NodeId::ROOT, ticks);
            return Some(NodeId::ROOT);
        }

        let below_root = if first.identity.is_root() {
            &path[1..]
        } else {
            warn!(
                frame = %first.identity,
                leaf = %leaf.identity,
                "sample path does not start at the root; merging from the tree root"
            );
            path
        };

        let mut cursor = NodeId::ROOT;
        for frame in below_root {
            cursor = match self.find_child(cursor, &frame.identity) {
                Some(child) => child,
                None => self.insert_child(cursor, frame),
            };
        }

        self.add_ticks(cursor, ticks);
        Some(cursor)
    }

    fn find_child(&self, parent: NodeId, identity: &NodeIdentity) -> Option<NodeId> {
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).is_some_and(|n| n.identity == *identity))
    }

    fn insert_child(&mut self, parent: NodeId, frame: &SampleFrame) -> NodeId {
        let id = self.push_node(Some(parent), frame.self_id, frame.identity.clone());
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    fn push_node(&mut self, parent: Option<NodeId>, self_id: u64, identity: NodeIdentity) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = parent
            .and_then(|p| self.node(p))
            .map_or(0, |p| p.depth + 1);
        self.files
            .entry(identity.file.clone())
            .or_default()
            .push(id);
        self.max_depth = self.max_depth.max(depth);
        self.nodes.push(CallTreeNode {
            id,
            self_id,
            identity,
            self_ticks: 0,
            descendant_ticks: 0,
            parent,
            children: Vec::new(),
            depth,
        });
        id
    }
}

impl Default for CallTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::identity::ROOT_NAME;

    fn frame(self_id: u64, parent: Option<u64>, file: &str, name: &str, line: i64) -> SampleFrame {
        SampleFrame {
            self_id,
            parent,
            identity: NodeIdentity::new(file, name, line),
            tick_count: 0,
        }
    }

    fn root_frame() -> SampleFrame {
        frame(1, None, "", ROOT_NAME, 0)
    }

    fn subtree_self_ticks(tree: &CallTree, id: NodeId) -> u64 {
        let Some(node) = tree.node(id) else {
            return 0;
        };
        node.children
            .iter()
            .map(|&c| tree.node(c).map_or(0, |n| n.self_ticks) + subtree_self_ticks(tree, c))
            .sum()
    }

    fn assert_invariants(tree: &CallTree) {
        for node in tree.nodes() {
            assert_eq!(
                node.descendant_ticks,
                subtree_self_ticks(tree, node.id),
                "descendant ticks out of sync at {}",
                node.identity
            );
            let mut seen = HashSet::new();
            for &c in &node.children {
                let child = tree.node(c).map(|n| n.identity.clone());
                assert!(seen.insert(child), "duplicate sibling under {}", node.identity);
            }
            if let Some(parent) = tree.parent(node.id) {
                assert_eq!(node.depth, parent.depth + 1);
            } else {
                assert_eq!(node.depth, 0);
            }
        }
    }

    #[test]
    fn new_tree_has_only_root() {
        let tree = CallTree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert!(tree.root().identity.is_root());
        assert_eq!(tree.total_ticks(), 0);
        assert_eq!(tree.root().depth, 0);
    }

    #[test]
    fn merge_creates_path_and_propagates_ticks() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let main = frame(2, Some(1), "/app/a.js", "main", 1);
        let work = frame(3, Some(2), "/app/a.js", "work", 5);

        let leaf = tree.merge_sample(&[&root, &main, &work], 7);
        assert_invariants(&tree);

        let leaf = leaf.and_then(|id| tree.node(id));
        assert!(matches!(leaf, Some(n) if n.identity.name == "work" && n.self_ticks == 7 && n.depth == 2));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.total_ticks(), 7);
        assert_eq!(tree.max_depth(), 2);

        let main_node = tree.nodes_for_file("/app/a.js").find(|n| n.identity.name == "main");
        assert!(matches!(main_node, Some(n) if n.self_ticks == 0 && n.descendant_ticks == 7));
    }

    #[test]
    fn shared_prefixes_reuse_nodes() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let main = frame(2, Some(1), "/app/a.js", "main", 1);
        let foo = frame(3, Some(2), "/app/a.js", "foo", 10);
        let bar = frame(4, Some(2), "/app/b.js", "bar", 3);

        tree.merge_sample(&[&root, &main, &foo], 4);
        tree.merge_sample(&[&root, &main, &bar], 6);
        tree.merge_sample(&[&root, &main], 1);
        assert_invariants(&tree);

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root().children.len(), 1);
        assert_eq!(tree.total_ticks(), 11);
        let main_node = tree.nodes_for_file("/app/a.js").find(|n| n.identity.name == "main");
        assert!(matches!(main_node, Some(n) if n.self_ticks == 1 && n.descendant_ticks == 10 && n.children.len() == 2));
    }

    #[test]
    fn merging_twice_doubles_counts_not_nodes() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let main = frame(2, Some(1), "/app/a.js", "main", 1);
        let foo = frame(3, Some(2), "/app/a.js", "foo", 10);

        tree.merge_sample(&[&root, &main, &foo], 5);
        let shape = tree.len();
        tree.merge_sample(&[&root, &main, &foo], 5);
        assert_invariants(&tree);

        assert_eq!(tree.len(), shape);
        let foo_node = tree.nodes_for_file("/app/a.js").find(|n| n.identity.name == "foo");
        assert!(matches!(foo_node, Some(n) if n.self_ticks == 10));
        assert_eq!(tree.total_ticks(), 10);
    }

    #[test]
    fn same_function_under_different_parents_stays_separate() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let a = frame(2, Some(1), "/app/a.js", "a", 1);
        let b = frame(3, Some(1), "/app/a.js", "b", 2);
        let foo = frame(4, Some(2), "/app/a.js", "foo", 10);

        tree.merge_sample(&[&root, &a, &foo], 1);
        tree.merge_sample(&[&root, &b, &foo], 1);
        assert_invariants(&tree);

        assert_eq!(tree.nodes_for_file("/app/a.js").filter(|n| n.identity.name == "foo").count(), 2);
    }

    #[test]
    fn root_only_path_credits_root_self_ticks() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let id = tree.merge_sample(&[&root], 9);
        assert_eq!(id, Some(NodeId::ROOT));
        assert_eq!(tree.root().self_ticks, 9);
        assert_eq!(tree.total_ticks(), 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn path_not_starting_at_root_merges_from_root() {
        let mut tree = CallTree::new();
        let top = frame(1, None, "f", "", 1);
        let example = frame(2, Some(1), "f", "example", 7);

        tree.merge_sample(&[&top], 115);
        tree.merge_sample(&[&top, &example], 55);
        assert_invariants(&tree);

        assert_eq!(tree.root().children.len(), 1);
        assert_eq!(tree.total_ticks(), 170);
        let anon = tree.nodes_for_file("f").find(|n| n.identity.name.is_empty());
        assert!(matches!(anon, Some(n) if n.self_ticks == 115 && n.descendant_ticks == 55 && n.depth == 1));
    }

    #[test]
    fn empty_path_is_ignored() {
        let mut tree = CallTree::new();
        assert_eq!(tree.merge_sample(&[], 3), None);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.total_ticks(), 0);
    }

    #[test]
    fn file_index_tracks_every_node_once() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let main = frame(2, Some(1), "/app/a.js", "main", 1);
        let bar = frame(3, Some(2), "/app/b.js", "bar", 3);
        tree.merge_sample(&[&root, &main, &bar], 2);
        tree.merge_sample(&[&root, &main, &bar], 2);

        assert_eq!(tree.nodes_for_file("/app/a.js").count(), 1);
        assert_eq!(tree.nodes_for_file("/app/b.js").count(), 1);
        assert_eq!(tree.nodes_for_file("/app/missing.js").count(), 0);
        // Root lives under the empty file.
        assert_eq!(tree.nodes_for_file("").count(), 1);
        assert_eq!(tree.file_count(), 3);

        let indexed: usize = ["", "/app/a.js", "/app/b.js"]
            .iter()
            .map(|f| tree.nodes_for_file(f).count())
            .sum();
        assert_eq!(indexed, tree.len());
    }

    #[test]
    fn huge_tick_counts_saturate() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let main = frame(2, Some(1), "/app/a.js", "main", 1);
        let work = frame(3, Some(2), "/app/a.js", "work", 5);

        tree.merge_sample(&[&root, &main, &work], u64::MAX);
        tree.merge_sample(&[&root, &main, &work], 1);
        tree.merge_sample(&[&root, &main], 1);

        assert_eq!(tree.total_ticks(), u64::MAX);
        let work_node = tree.nodes_for_file("/app/a.js").find(|n| n.identity.name == "work");
        assert!(matches!(work_node, Some(n) if n.self_ticks == u64::MAX));
        let main_node = tree.nodes_for_file("/app/a.js").find(|n| n.identity.name == "main");
        assert!(matches!(main_node, Some(n) if n.self_ticks == 1 && n.descendant_ticks == u64::MAX));
    }

    #[test]
    fn zero_tick_merge_still_creates_intermediates() {
        let mut tree = CallTree::new();
        let root = root_frame();
        let main = frame(2, Some(1), "/app/a.js", "main", 1);
        tree.merge_sample(&[&root, &main], 0);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.total_ticks(), 0);
    }
}
