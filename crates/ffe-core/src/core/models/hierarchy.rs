use super::ids::NodeId;
use super::node::{AtomData, Kind, Node, NodeKind, SystemData, ValenceKind};
use super::path::NodePath;
use nalgebra::Point3;
use slotmap::{SecondaryMap, SlotMap};
use thiserror::Error;

const ROOT_NAME: &str = "Structures";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Node {0:?} does not exist in the hierarchy")]
    UnknownNode(NodeId),

    #[error("A {child} node cannot be placed under a {parent} node")]
    InvalidParent { parent: Kind, child: Kind },

    #[error("Node {0:?} is not an atom")]
    NotAnAtom(NodeId),

    #[error("Node {0:?} is not a system")]
    NotASystem(NodeId),

    #[error("System {0:?} is already attached to the root")]
    AlreadyAttached(NodeId),

    #[error("System {0:?} is not attached to the root")]
    NotAttached(NodeId),

    #[error("A {kind:?} term needs {expected} distinct atoms of a single system")]
    InvalidTerm { kind: ValenceKind, expected: usize },
}

/// Valence terms an atom takes part in, each list in insertion order.
#[derive(Debug, Clone, Default)]
struct AtomTerms {
    bonds: Vec<NodeId>,
    angles: Vec<NodeId>,
    dihedrals: Vec<NodeId>,
}

impl AtomTerms {
    fn list(&self, kind: ValenceKind) -> &[NodeId] {
        match kind {
            ValenceKind::Bond => &self.bonds,
            ValenceKind::Angle => &self.angles,
            ValenceKind::Dihedral => &self.dihedrals,
        }
    }

    fn list_mut(&mut self, kind: ValenceKind) -> &mut Vec<NodeId> {
        match kind {
            ValenceKind::Bond => &mut self.bonds,
            ValenceKind::Angle => &mut self.angles,
            ValenceKind::Dihedral => &mut self.dihedrals,
        }
    }
}

/// A System subtree that has been unlinked from the hierarchy.
///
/// Owning the nodes here is what lets teardown run away from the tree: the arena
/// keys are gone, so every outstanding path or pick reference into the subtree is
/// immediately stale.
#[derive(Debug)]
pub struct DetachedSystem {
    pub id: NodeId,
    pub name: String,
    pub nodes: Vec<(NodeId, Node)>,
}

/// The molecular tree: one root owning a forest of System subtrees.
///
/// Storage is an arena keyed by [`NodeId`]. Systems are created unattached, built
/// up with the `add_*` methods, and then attached under the root.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    atom_terms: SecondaryMap<NodeId, AtomTerms>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(ROOT_NAME, NodeKind::Root));
        Self {
            nodes,
            root,
            atom_terms: SecondaryMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn kind_of(&self, id: NodeId) -> Option<Kind> {
        self.nodes.get(id).map(Node::kind)
    }

    /// Systems currently attached under the root, in attach order.
    pub fn systems(&self) -> &[NodeId] {
        &self.nodes[self.root].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Creates a new, unattached System node.
    pub fn create_system(&mut self, name: &str, data: SystemData) -> NodeId {
        self.nodes.insert(Node::new(name, NodeKind::System(data)))
    }

    pub fn add_polymer(&mut self, parent: NodeId, name: &str) -> Result<NodeId, ModelError> {
        self.insert_child(parent, Node::new(name, NodeKind::Polymer))
    }

    pub fn add_residue(&mut self, parent: NodeId, name: &str) -> Result<NodeId, ModelError> {
        self.insert_child(parent, Node::new(name, NodeKind::Residue))
    }

    pub fn add_molecule(&mut self, parent: NodeId, name: &str) -> Result<NodeId, ModelError> {
        self.insert_child(parent, Node::new(name, NodeKind::Molecule))
    }

    pub fn add_atom(
        &mut self,
        parent: NodeId,
        name: &str,
        atom: AtomData,
    ) -> Result<NodeId, ModelError> {
        let id = self.insert_child(parent, Node::new(name, NodeKind::Atom(atom)))?;
        self.atom_terms.insert(id, AtomTerms::default());
        Ok(id)
    }

    pub fn add_bond(&mut self, parent: NodeId, atoms: [NodeId; 2]) -> Result<NodeId, ModelError> {
        self.add_valence_term(parent, ValenceKind::Bond, &atoms)
    }

    pub fn add_angle(&mut self, parent: NodeId, atoms: [NodeId; 3]) -> Result<NodeId, ModelError> {
        self.add_valence_term(parent, ValenceKind::Angle, &atoms)
    }

    pub fn add_dihedral(
        &mut self,
        parent: NodeId,
        atoms: [NodeId; 4],
    ) -> Result<NodeId, ModelError> {
        self.add_valence_term(parent, ValenceKind::Dihedral, &atoms)
    }

    /// Adds a valence term grouping `atoms` under `parent`.
    ///
    /// The atoms must be distinct, must all exist, and must belong to the same
    /// system as `parent`. The term is appended to each atom's term list, so
    /// per-atom lists reflect insertion order.
    pub fn add_valence_term(
        &mut self,
        parent: NodeId,
        kind: ValenceKind,
        atoms: &[NodeId],
    ) -> Result<NodeId, ModelError> {
        let invalid = || ModelError::InvalidTerm {
            kind,
            expected: kind.arity(),
        };
        if atoms.len() != kind.arity() {
            return Err(invalid());
        }
        for (i, &atom) in atoms.iter().enumerate() {
            if self.kind_of(atom).ok_or(ModelError::UnknownNode(atom))? != Kind::Atom {
                return Err(ModelError::NotAnAtom(atom));
            }
            if atoms[..i].contains(&atom) {
                return Err(invalid());
            }
        }
        let owner = self.enclosing_system(parent);
        if owner.is_none() || atoms.iter().any(|&a| self.enclosing_system(a) != owner) {
            return Err(invalid());
        }

        let name = atoms
            .iter()
            .map(|&a| self.nodes[a].name.as_str())
            .collect::<Vec<_>>()
            .join("-");
        let data = match kind {
            ValenceKind::Bond => NodeKind::Bond([atoms[0], atoms[1]]),
            ValenceKind::Angle => NodeKind::Angle([atoms[0], atoms[1], atoms[2]]),
            ValenceKind::Dihedral => {
                NodeKind::Dihedral([atoms[0], atoms[1], atoms[2], atoms[3]])
            }
        };
        let id = self.insert_child(parent, Node::new(&name, data))?;
        for &atom in atoms {
            if let Some(terms) = self.atom_terms.get_mut(atom) {
                terms.list_mut(kind).push(id);
            }
        }
        Ok(id)
    }

    fn insert_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, ModelError> {
        let parent_kind = self
            .kind_of(parent)
            .ok_or(ModelError::UnknownNode(parent))?;
        let child_kind = node.kind();
        if !Self::accepts(parent_kind, child_kind) {
            return Err(ModelError::InvalidParent {
                parent: parent_kind,
                child: child_kind,
            });
        }
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    fn accepts(parent: Kind, child: Kind) -> bool {
        match child {
            Kind::Root | Kind::System => false,
            Kind::Polymer | Kind::Molecule => parent == Kind::System,
            Kind::Residue => matches!(parent, Kind::System | Kind::Polymer),
            Kind::Atom | Kind::Bond | Kind::Angle | Kind::Dihedral => {
                parent.is_container() && parent != Kind::Root
            }
        }
    }

    /// Links an unattached System as the last child of the root.
    pub(crate) fn attach_system(&mut self, system: NodeId) -> Result<(), ModelError> {
        let node = self
            .nodes
            .get(system)
            .ok_or(ModelError::UnknownNode(system))?;
        if node.kind() != Kind::System {
            return Err(ModelError::NotASystem(system));
        }
        if node.parent.is_some() {
            return Err(ModelError::AlreadyAttached(system));
        }
        self.nodes[system].parent = Some(self.root);
        self.nodes[self.root].children.push(system);
        Ok(())
    }

    /// Unlinks an attached System and moves its whole subtree out of the arena.
    pub(crate) fn extract_system(&mut self, system: NodeId) -> Result<DetachedSystem, ModelError> {
        let node = self
            .nodes
            .get(system)
            .ok_or(ModelError::UnknownNode(system))?;
        if node.kind() != Kind::System {
            return Err(ModelError::NotASystem(system));
        }
        if node.parent != Some(self.root) {
            return Err(ModelError::NotAttached(system));
        }
        let name = node.name.clone();
        self.nodes[self.root].children.retain(|&id| id != system);

        let subtree = self.descendants(system);
        let mut nodes = Vec::with_capacity(subtree.len());
        for id in subtree {
            self.atom_terms.remove(id);
            if let Some(node) = self.nodes.remove(id) {
                nodes.push((id, node));
            }
        }
        Ok(DetachedSystem {
            id: system,
            name,
            nodes,
        })
    }

    /// Iterates from `id` up to the root, starting with `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(
            self.nodes.contains_key(id).then_some(id),
            move |&current| self.nodes.get(current).and_then(|n| n.parent),
        )
    }

    /// Materializes the root-to-node path from the live parent links.
    ///
    /// Returns `None` for unknown nodes and for nodes whose subtree is not
    /// attached under the root.
    pub fn path_of(&self, id: NodeId) -> Option<NodePath> {
        let mut chain: Vec<NodeId> = self.ancestors(id).collect();
        if chain.last() != Some(&self.root) {
            return None;
        }
        chain.reverse();
        Some(NodePath::new(chain))
    }

    /// Checks that every link in `path` still matches the live tree.
    pub fn is_live_path(&self, path: &NodePath) -> bool {
        let nodes = path.nodes();
        if nodes.first() != Some(&self.root) {
            return false;
        }
        nodes.windows(2).all(|pair| {
            self.nodes
                .get(pair[1])
                .is_some_and(|child| child.parent == Some(pair[0]))
        })
    }

    /// A node is stale once it has left the arena or its subtree is no longer
    /// attached under the root.
    pub fn is_stale(&self, id: NodeId) -> bool {
        self.path_of(id).is_none()
    }

    pub fn enclosing_system(&self, id: NodeId) -> Option<NodeId> {
        self.nearest_ancestor_of_kind(id, Kind::System)
    }

    /// Finds the closest node of `kind` among `id` and its ancestors.
    pub fn nearest_ancestor_of_kind(&self, id: NodeId, kind: Kind) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&ancestor| self.nodes[ancestor].kind() == kind)
    }

    /// Valence terms of `kind` that reference `atom`, in insertion order.
    pub fn valence_terms(&self, atom: NodeId, kind: ValenceKind) -> &[NodeId] {
        self.atom_terms
            .get(atom)
            .map(|terms| terms.list(kind))
            .unwrap_or(&[])
    }

    /// All nodes of the subtree rooted at `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Atoms of a subtree in pre-order. This is also the vertex order of the
    /// batched per-system geometry handed to the renderer.
    pub fn atoms_of(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.nodes[n].kind() == Kind::Atom)
            .collect()
    }

    /// Resolves an index into a system's batched geometry back to the atom.
    pub fn atom_at(&self, system: NodeId, index: usize) -> Option<NodeId> {
        if self.kind_of(system)? != Kind::System {
            return None;
        }
        self.atoms_of(system).get(index).copied()
    }

    pub fn atom_position(&self, atom: NodeId) -> Option<Point3<f64>> {
        self.nodes
            .get(atom)
            .and_then(Node::as_atom)
            .map(|a| a.position)
    }

    pub fn find_child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].name == name)
    }

    /// Resolves a sequence of names starting below the root, e.g.
    /// `["water", "HOH1", "O"]`.
    pub fn find_by_names(&self, names: &[&str]) -> Option<NodeId> {
        names
            .iter()
            .try_fold(self.root, |parent, name| self.find_child_by_name(parent, name))
    }

    /// Human-readable name path, e.g. `water/HOH1/O`.
    pub fn display_path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .filter(|&n| n != self.root)
            .map(|n| self.nodes[n].name.as_str())
            .collect();
        names.reverse();
        names.join("/")
    }

    pub(crate) fn set_selected(&mut self, id: NodeId, selected: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.selected = selected;
        }
    }

    pub(crate) fn set_parallel(&mut self, system: NodeId, parallel: bool) {
        if let Some(Node {
            data: NodeKind::System(data),
            ..
        }) = self.nodes.get_mut(system)
        {
            data.parallel = parallel;
        }
    }
}
