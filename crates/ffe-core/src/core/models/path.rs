use super::ids::NodeId;

/// An ordered root-to-node chain of node keys.
///
/// Paths are materialized on demand from the live parent links (see
/// [`Hierarchy::path_of`](super::hierarchy::Hierarchy::path_of)) and are never
/// stored on the nodes themselves, so a path cannot silently drift from the tree.
/// A path held across a tree mutation may go stale; callers validate it with
/// [`Hierarchy::is_live_path`](super::hierarchy::Hierarchy::is_live_path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<NodeId>);

impl NodePath {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The node this path leads to.
    pub fn terminal(&self) -> Option<NodeId> {
        self.0.last().copied()
    }

    /// Strict ancestry: `self` is a proper prefix of `other`.
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// `self` equals `other` or is one of its ancestors.
    pub fn covers(&self, other: &NodePath) -> bool {
        !self.0.is_empty() && other.0.starts_with(&self.0)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.0.contains(&node)
    }
}

impl From<Vec<NodeId>> for NodePath {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }
}
