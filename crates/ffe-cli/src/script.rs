//! Session scripts: a TOML description of the systems to load and the user
//! interaction to replay against them.
//!
//! ```toml
//! [[systems]]
//! name = "water"
//! scale = 0.5
//! rotation = { axis = [0.0, 0.0, 1.0], degrees = 90.0 }
//! translation = [1.0, 0.0, 0.0]
//! atoms = [
//!     { name = "O", position = [0.0, 0.0, 0.0], element = "O", residue = "HOH1" },
//!     { name = "H1", position = [0.96, 0.0, 0.0], residue = "HOH1" },
//! ]
//! bonds = [["O", "H1"]]
//!
//! [[steps]]
//! action = "attach"
//! system = "water"
//!
//! [[steps]]
//! action = "pick"
//! atom = "water/HOH1/O"
//! ```

use crate::error::{CliError, Result};
use ffexplorer::core::models::hierarchy::Hierarchy;
use ffexplorer::core::models::ids::NodeId;
use ffexplorer::core::models::node::{AtomData, SystemData};
use ffexplorer::core::models::topology::derive_valence_terms;
use ffexplorer::core::utils::geometry::RigidTransform;
use ffexplorer::engine::picking::PickLevel;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

fn default_scale() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct AxisAngle {
    pub axis: [f64; 3],
    pub degrees: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct AtomEntry {
    pub name: String,
    pub position: [f64; 3],
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub polymer: Option<String>,
    #[serde(default)]
    pub residue: Option<String>,
    #[serde(default)]
    pub molecule: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SystemEntry {
    pub name: String,
    #[serde(default)]
    pub force_field: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub rotation: Option<AxisAngle>,
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default)]
    pub atoms: Vec<AtomEntry>,
    #[serde(default)]
    pub bonds: Vec<[String; 2]>,
    /// Derive angles and dihedrals from the bonds.
    #[serde(default = "default_true")]
    pub derive_terms: bool,
}

impl SystemEntry {
    pub fn transform(&self) -> RigidTransform {
        let translation = Vector3::from(self.translation);
        match self.rotation {
            Some(rotation) => RigidTransform::from_axis_angle(
                self.scale,
                &Vector3::from(rotation.axis),
                rotation.degrees,
                translation,
            ),
            None => RigidTransform {
                scale: self.scale,
                translation,
                ..RigidTransform::identity()
            },
        }
    }
}

/// One replayed user interaction. Node references are name paths below the
/// root, separated by `/`, e.g. `water/HOH1/O`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    Attach {
        system: String,
    },
    Detach {
        system: String,
    },
    Select {
        #[serde(default)]
        add: Vec<String>,
        #[serde(default)]
        remove: Vec<String>,
        #[serde(default)]
        lead: Option<String>,
    },
    SelectAll,
    PickLevel {
        level: PickLevel,
    },
    Pick {
        #[serde(default)]
        atom: Option<String>,
        #[serde(default)]
        modifier: bool,
        /// Report the hit as batched system geometry instead of a per-atom shape.
        #[serde(default)]
        batched: bool,
    },
    Activate {
        #[serde(default)]
        system: Option<String>,
    },
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Attach { .. } => "attach",
            Step::Detach { .. } => "detach",
            Step::Select { .. } => "select",
            Step::SelectAll => "select-all",
            Step::PickLevel { .. } => "pick-level",
            Step::Pick { .. } => "pick",
            Step::Activate { .. } => "activate",
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Session {
    #[serde(default)]
    pub systems: Vec<SystemEntry>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A system built from a [`SystemEntry`], not yet attached.
#[derive(Debug, Clone)]
pub struct BuiltSystem {
    pub name: String,
    pub id: NodeId,
    pub transform: RigidTransform,
    pub atoms: usize,
    pub bonds: usize,
    pub angles: usize,
    pub dihedrals: usize,
}

impl Session {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading session script from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            CliError::Other(source) => CliError::FileParsing {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let session: Session = toml::from_str(content).map_err(anyhow::Error::from)?;
        let mut seen = Vec::with_capacity(session.systems.len());
        for system in &session.systems {
            if system.name.contains('/') || system.name.is_empty() {
                return Err(CliError::Script(format!(
                    "system name '{}' must be non-empty and must not contain '/'",
                    system.name
                )));
            }
            if seen.contains(&system.name.as_str()) {
                return Err(CliError::Script(format!(
                    "system '{}' is defined twice",
                    system.name
                )));
            }
            seen.push(system.name.as_str());
        }
        Ok(session)
    }

    /// Builds every system into `hierarchy`, unattached, in script order.
    pub fn build(&self, hierarchy: &mut Hierarchy) -> Result<Vec<BuiltSystem>> {
        self.systems
            .iter()
            .map(|entry| build_system(hierarchy, entry))
            .collect()
    }
}

fn build_system(hierarchy: &mut Hierarchy, entry: &SystemEntry) -> Result<BuiltSystem> {
    let system = hierarchy.create_system(
        &entry.name,
        SystemData {
            force_field: entry.force_field.clone(),
            keywords: entry.keywords.clone(),
            parallel: false,
        },
    );

    let mut groups: HashMap<(Option<String>, &'static str, String), NodeId> = HashMap::new();
    let mut atoms: HashMap<&str, NodeId> = HashMap::new();
    for atom in &entry.atoms {
        let parent = atom_parent(hierarchy, &mut groups, system, entry, atom)?;
        let mut data = AtomData::new(Point3::from(atom.position));
        if let Some(element) = &atom.element {
            data.element = element.clone();
        }
        let id = hierarchy.add_atom(parent, &atom.name, data)?;
        if atoms.insert(atom.name.as_str(), id).is_some() {
            return Err(CliError::Script(format!(
                "atom '{}' appears twice in system '{}'",
                atom.name, entry.name
            )));
        }
    }

    for [first, second] in &entry.bonds {
        let lookup = |name: &String| {
            atoms.get(name.as_str()).copied().ok_or_else(|| {
                CliError::Script(format!(
                    "bond references unknown atom '{}' in system '{}'",
                    name, entry.name
                ))
            })
        };
        let (a, b) = (lookup(first)?, lookup(second)?);
        let parent = hierarchy
            .node(a)
            .and_then(|n| n.parent())
            .unwrap_or(system);
        hierarchy.add_bond(parent, [a, b])?;
    }

    let (angles, dihedrals) = if entry.derive_terms {
        let derived = derive_valence_terms(hierarchy, system)?;
        (derived.angles, derived.dihedrals)
    } else {
        (0, 0)
    };

    debug!(
        system = %entry.name,
        atoms = atoms.len(),
        bonds = entry.bonds.len(),
        angles,
        dihedrals,
        "Built system from script"
    );
    Ok(BuiltSystem {
        name: entry.name.clone(),
        id: system,
        transform: entry.transform(),
        atoms: atoms.len(),
        bonds: entry.bonds.len(),
        angles,
        dihedrals,
    })
}

/// Finds or creates the grouping node an atom lives in. Residues go inside
/// their polymer when one is named; molecules hang directly off the system.
fn atom_parent(
    hierarchy: &mut Hierarchy,
    groups: &mut HashMap<(Option<String>, &'static str, String), NodeId>,
    system: NodeId,
    entry: &SystemEntry,
    atom: &AtomEntry,
) -> Result<NodeId> {
    if atom.molecule.is_some() && (atom.polymer.is_some() || atom.residue.is_some()) {
        return Err(CliError::Script(format!(
            "atom '{}' in system '{}' cannot belong to a molecule and a polymer or residue",
            atom.name, entry.name
        )));
    }

    if let Some(molecule) = &atom.molecule {
        let key = (None, "molecule", molecule.clone());
        return match groups.get(&key) {
            Some(&id) => Ok(id),
            None => {
                let id = hierarchy.add_molecule(system, molecule)?;
                groups.insert(key, id);
                Ok(id)
            }
        };
    }

    let mut parent = system;
    if let Some(polymer) = &atom.polymer {
        let key = (None, "polymer", polymer.clone());
        parent = match groups.get(&key) {
            Some(&id) => id,
            None => {
                let id = hierarchy.add_polymer(system, polymer)?;
                groups.insert(key, id);
                id
            }
        };
    }
    if let Some(residue) = &atom.residue {
        let key = (atom.polymer.clone(), "residue", residue.clone());
        parent = match groups.get(&key) {
            Some(&id) => id,
            None => {
                let id = hierarchy.add_residue(parent, residue)?;
                groups.insert(key, id);
                id
            }
        };
    }
    Ok(parent)
}
