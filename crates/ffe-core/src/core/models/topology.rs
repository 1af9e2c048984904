use super::hierarchy::{Hierarchy, ModelError};
use super::ids::NodeId;
use super::node::{Kind, NodeKind, ValenceKind};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Counts of the terms created by [`derive_valence_terms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivedTerms {
    pub angles: usize,
    pub dihedrals: usize,
}

fn canonical_angle(a: NodeId, b: NodeId, c: NodeId) -> [NodeId; 3] {
    if a <= c { [a, b, c] } else { [c, b, a] }
}

fn canonical_dihedral(a: NodeId, b: NodeId, c: NodeId, d: NodeId) -> [NodeId; 4] {
    let forward = [a, b, c, d];
    let reverse = [d, c, b, a];
    if forward <= reverse { forward } else { reverse }
}

/// Generates the angle and dihedral terms implied by a system's bond graph.
///
/// Every pair of bonds sharing an atom yields one angle centred on that atom, and
/// every bonded chain `a-b-c-d` with `a != d` yields one dihedral about `b-c`.
/// Terms that already exist (in either direction) are left alone, so calling
/// this twice is harmless. New terms are placed under the parent of their
/// central atom (`b` for both kinds).
pub fn derive_valence_terms(
    hierarchy: &mut Hierarchy,
    system: NodeId,
) -> Result<DerivedTerms, ModelError> {
    match hierarchy.kind_of(system) {
        None => return Err(ModelError::UnknownNode(system)),
        Some(Kind::System) => {}
        Some(_) => return Err(ModelError::NotASystem(system)),
    }

    let mut neighbors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut bonds: Vec<[NodeId; 2]> = Vec::new();
    let mut existing_angles = HashSet::new();
    let mut existing_dihedrals = HashSet::new();

    for id in hierarchy.descendants(system) {
        let Some(node) = hierarchy.node(id) else {
            continue;
        };
        match node.data {
            NodeKind::Bond([a, b]) => {
                neighbors.entry(a).or_default().push(b);
                neighbors.entry(b).or_default().push(a);
                bonds.push([a, b]);
            }
            NodeKind::Angle([a, b, c]) => {
                existing_angles.insert(canonical_angle(a, b, c));
            }
            NodeKind::Dihedral([a, b, c, d]) => {
                existing_dihedrals.insert(canonical_dihedral(a, b, c, d));
            }
            _ => {}
        }
    }

    let mut new_angles = Vec::new();
    for &center in hierarchy.atoms_of(system).iter() {
        let Some(bonded) = neighbors.get(&center) else {
            continue;
        };
        for (i, &a) in bonded.iter().enumerate() {
            for &c in &bonded[i + 1..] {
                if existing_angles.insert(canonical_angle(a, center, c)) {
                    new_angles.push([a, center, c]);
                }
            }
        }
    }

    let mut new_dihedrals = Vec::new();
    for [b, c] in bonds {
        let (Some(left), Some(right)) = (neighbors.get(&b), neighbors.get(&c)) else {
            continue;
        };
        for &a in left.iter().filter(|&&a| a != c) {
            for &d in right.iter().filter(|&&d| d != b && d != a) {
                if existing_dihedrals.insert(canonical_dihedral(a, b, c, d)) {
                    new_dihedrals.push([a, b, c, d]);
                }
            }
        }
    }

    let parent_of = |hierarchy: &Hierarchy, atom: NodeId| {
        hierarchy
            .node(atom)
            .and_then(|n| n.parent())
            .ok_or(ModelError::UnknownNode(atom))
    };

    let derived = DerivedTerms {
        angles: new_angles.len(),
        dihedrals: new_dihedrals.len(),
    };
    for atoms in new_angles {
        let parent = parent_of(hierarchy, atoms[1])?;
        hierarchy.add_valence_term(parent, ValenceKind::Angle, &atoms)?;
    }
    for atoms in new_dihedrals {
        let parent = parent_of(hierarchy, atoms[1])?;
        hierarchy.add_valence_term(parent, ValenceKind::Dihedral, &atoms)?;
    }
    debug!(
        ?system,
        angles = derived.angles,
        dihedrals = derived.dihedrals,
        "Derived valence terms from bonds"
    );
    Ok(derived)
}
