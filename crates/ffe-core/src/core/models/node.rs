use super::ids::NodeId;
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of structural kinds a tree member can take.
///
/// This is the payload-free mirror of [`NodeKind`], used wherever code needs to
/// ask "what kind of node is this" or "find the nearest ancestor of kind X"
/// without borrowing the node data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Root,
    System,
    Polymer,
    Residue,
    Molecule,
    Atom,
    Bond,
    Angle,
    Dihedral,
}

impl Kind {
    /// Returns `true` for the valence-term groupings (bond, angle, dihedral).
    pub fn is_valence_term(self) -> bool {
        matches!(self, Kind::Bond | Kind::Angle | Kind::Dihedral)
    }

    /// Returns `true` for kinds that may own structural children.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Kind::Root | Kind::System | Kind::Polymer | Kind::Residue | Kind::Molecule
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Kind::Root => "Root",
                Kind::System => "System",
                Kind::Polymer => "Polymer",
                Kind::Residue => "Residue",
                Kind::Molecule => "Molecule",
                Kind::Atom => "Atom",
                Kind::Bond => "Bond",
                Kind::Angle => "Angle",
                Kind::Dihedral => "Dihedral",
            }
        )
    }
}

/// The three flavours of valence term an atom can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValenceKind {
    Bond,
    Angle,
    Dihedral,
}

impl ValenceKind {
    /// Number of atoms referenced by a term of this kind.
    pub fn arity(self) -> usize {
        match self {
            ValenceKind::Bond => 2,
            ValenceKind::Angle => 3,
            ValenceKind::Dihedral => 4,
        }
    }
}

impl From<ValenceKind> for Kind {
    fn from(kind: ValenceKind) -> Self {
        match kind {
            ValenceKind::Bond => Kind::Bond,
            ValenceKind::Angle => Kind::Angle,
            ValenceKind::Dihedral => Kind::Dihedral,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid valence kind string")]
pub struct ParseValenceKindError;

impl FromStr for ValenceKind {
    type Err = ParseValenceKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bond" => Ok(ValenceKind::Bond),
            "angle" => Ok(ValenceKind::Angle),
            "dihedral" | "torsion" => Ok(ValenceKind::Dihedral),
            _ => Err(ParseValenceKindError),
        }
    }
}

/// Metadata carried by a top-level molecular assembly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemData {
    /// Name of the force field the system was parameterized with, if known.
    pub force_field: Option<String>,
    /// Keyword lines associated with the system (opaque to this crate).
    pub keywords: Vec<String>,
    /// Opaque tag set on attach when parallel execution is enabled.
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomData {
    /// Coordinates in the enclosing system's local frame, in Angstroms.
    pub position: Point3<f64>,
    /// Element symbol or force field type, informational only.
    pub element: String,
}

impl AtomData {
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            element: String::new(),
        }
    }
}

/// Payload of a tree member. Valence terms hold back-references to the atoms
/// they group; the atoms are owned elsewhere in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    System(SystemData),
    Polymer,
    Residue,
    Molecule,
    Atom(AtomData),
    Bond([NodeId; 2]),
    Angle([NodeId; 3]),
    Dihedral([NodeId; 4]),
}

impl NodeKind {
    pub fn kind(&self) -> Kind {
        match self {
            NodeKind::Root => Kind::Root,
            NodeKind::System(_) => Kind::System,
            NodeKind::Polymer => Kind::Polymer,
            NodeKind::Residue => Kind::Residue,
            NodeKind::Molecule => Kind::Molecule,
            NodeKind::Atom(_) => Kind::Atom,
            NodeKind::Bond(_) => Kind::Bond,
            NodeKind::Angle(_) => Kind::Angle,
            NodeKind::Dihedral(_) => Kind::Dihedral,
        }
    }

    /// Atoms referenced by a valence term, or an empty slice for any other kind.
    pub fn term_atoms(&self) -> &[NodeId] {
        match self {
            NodeKind::Bond(atoms) => atoms,
            NodeKind::Angle(atoms) => atoms,
            NodeKind::Dihedral(atoms) => atoms,
            _ => &[],
        }
    }
}

/// A member of the molecular tree.
///
/// Nodes live in the [`Hierarchy`](super::hierarchy::Hierarchy) arena. The parent
/// link is a plain key, so a child never owns its parent; the children vector is
/// the owning, ordered side of the relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub data: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) selected: bool,
}

impl Node {
    pub(crate) fn new(name: &str, data: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            data,
            parent: None,
            children: Vec::new(),
            selected: false,
        }
    }

    pub fn kind(&self) -> Kind {
        self.data.kind()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node is currently flagged as a member of the selection set.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn as_atom(&self) -> Option<&AtomData> {
        match &self.data {
            NodeKind::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    pub fn as_system(&self) -> Option<&SystemData> {
        match &self.data {
            NodeKind::System(system) => Some(system),
            _ => None,
        }
    }
}
