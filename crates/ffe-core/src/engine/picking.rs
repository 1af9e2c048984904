use super::collaborators::{ColorModel, HitTarget, PickHit, Renderer};
use super::config::ConfigError;
use super::selection::{SelectionTree, TreeSelectionEvent};
use crate::core::models::hierarchy::Hierarchy;
use crate::core::models::ids::NodeId;
use crate::core::models::node::{Kind, ValenceKind};
use crate::core::utils::geometry::{bond_angle, dihedral_angle, distance};
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

const MEASUREMENT_CACHE_CAPACITY: usize = 4;

/// Granularity at which a viewport click is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickLevel {
    #[default]
    Atom,
    Bond,
    Angle,
    Dihedral,
    Residue,
    Polymer,
    Molecule,
    System,
    MeasureDistance,
    MeasureAngle,
    MeasureDihedral,
}

impl PickLevel {
    pub const ALL: [PickLevel; 11] = [
        PickLevel::Atom,
        PickLevel::Bond,
        PickLevel::Angle,
        PickLevel::Dihedral,
        PickLevel::Residue,
        PickLevel::Polymer,
        PickLevel::Molecule,
        PickLevel::System,
        PickLevel::MeasureDistance,
        PickLevel::MeasureAngle,
        PickLevel::MeasureDihedral,
    ];

    pub fn is_measurement(self) -> bool {
        self.measurement_kind().is_some()
    }

    pub fn measurement_kind(self) -> Option<MeasurementKind> {
        match self {
            PickLevel::MeasureDistance => Some(MeasurementKind::Distance),
            PickLevel::MeasureAngle => Some(MeasurementKind::Angle),
            PickLevel::MeasureDihedral => Some(MeasurementKind::Dihedral),
            _ => None,
        }
    }

    /// The valence-term family cycled through by repeat picks.
    pub fn valence_kind(self) -> Option<ValenceKind> {
        match self {
            PickLevel::Bond => Some(ValenceKind::Bond),
            PickLevel::Angle => Some(ValenceKind::Angle),
            PickLevel::Dihedral => Some(ValenceKind::Dihedral),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PickLevel::Atom => "atom",
            PickLevel::Bond => "bond",
            PickLevel::Angle => "angle",
            PickLevel::Dihedral => "dihedral",
            PickLevel::Residue => "residue",
            PickLevel::Polymer => "polymer",
            PickLevel::Molecule => "molecule",
            PickLevel::System => "system",
            PickLevel::MeasureDistance => "measure-distance",
            PickLevel::MeasureAngle => "measure-angle",
            PickLevel::MeasureDihedral => "measure-dihedral",
        }
    }
}

impl FromStr for PickLevel {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('_', "-");
        PickLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownVariant {
                kind: "pick level",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for PickLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    Distance,
    Angle,
    Dihedral,
}

impl MeasurementKind {
    pub fn required_atoms(self) -> usize {
        match self {
            MeasurementKind::Distance => 2,
            MeasurementKind::Angle => 3,
            MeasurementKind::Dihedral => 4,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MeasurementKind::Distance => "Å",
            MeasurementKind::Angle | MeasurementKind::Dihedral => "°",
        }
    }
}

/// A completed measurement. `atoms` are listed in pick order.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub kind: MeasurementKind,
    pub atoms: Vec<NodeId>,
    pub value: f64,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            MeasurementKind::Distance => "distance",
            MeasurementKind::Angle => "angle",
            MeasurementKind::Dihedral => "dihedral",
        };
        write!(f, "{} {:.4} {}", label, self.value, self.kind.unit())
    }
}

/// Outcome of one pick, for the caller to act upon.
#[derive(Debug, Clone, PartialEq)]
pub enum PickAction {
    /// Nothing recognizable under the cursor; no state changed.
    Miss,
    /// An atom was hit but the current level resolves to no node.
    NoTarget { atom: NodeId },
    /// The selection must be updated with `event`.
    Select {
        node: NodeId,
        event: TreeSelectionEvent,
    },
    /// `node` already is the only selection.
    Unchanged { node: NodeId },
    MeasurementPending { collected: usize, required: usize },
    Measured(Measurement),
}

/// Turns ray-cast hits into structural selections or measurements.
#[derive(Debug, Clone)]
pub struct PickStateMachine {
    level: PickLevel,
    vertices_per_atom: usize,
    previous_atom: Option<NodeId>,
    repeat: usize,
    current: Option<NodeId>,
    cache: VecDeque<NodeId>,
    collected: usize,
}

impl PickStateMachine {
    pub fn new(level: PickLevel, vertices_per_atom: usize) -> Self {
        Self {
            level,
            vertices_per_atom: vertices_per_atom.max(1),
            previous_atom: None,
            repeat: 0,
            current: None,
            cache: VecDeque::with_capacity(MEASUREMENT_CACHE_CAPACITY),
            collected: 0,
        }
    }

    pub fn level(&self) -> PickLevel {
        self.level
    }

    /// The node the last structural pick resolved to.
    pub fn current_pick(&self) -> Option<NodeId> {
        self.current
    }

    /// Atoms kept for measurement, most recent first. Retained after a
    /// measurement completes so it can be redrawn.
    pub fn measurement_cache(&self) -> Vec<NodeId> {
        self.cache.iter().copied().collect()
    }

    /// Atoms collected toward the measurement in progress.
    pub fn collected(&self) -> usize {
        self.collected
    }

    /// Switches the pick level, dropping the repeat counter and any measurement
    /// in progress. Entering a measurement level also reverts the color of the
    /// last structural pick.
    pub fn set_level(&mut self, level: PickLevel, renderer: &dyn Renderer) {
        if level.is_measurement() {
            if let Some(previous) = self.current.take() {
                renderer.recolor(previous, ColorModel::Revert);
            }
        }
        self.level = level;
        self.previous_atom = None;
        self.repeat = 0;
        self.clear_measurement(renderer);
        debug!(%level, "Pick level changed");
    }

    /// Maps a raw hit to a live atom. Batched system geometry is resolved
    /// through the primitive index.
    pub fn resolve_hit(&self, hierarchy: &Hierarchy, hit: Option<PickHit>) -> Option<NodeId> {
        let hit = hit?;
        let atom = match hit.target {
            HitTarget::Atom(atom) => atom,
            HitTarget::System(system) => {
                hierarchy.atom_at(system, hit.primitive_index / self.vertices_per_atom)?
            }
            HitTarget::AxisMarker | HitTarget::Other => return None,
        };
        (hierarchy.kind_of(atom) == Some(Kind::Atom) && !hierarchy.is_stale(atom)).then_some(atom)
    }

    pub fn pick(
        &mut self,
        hierarchy: &Hierarchy,
        selection: &SelectionTree,
        renderer: &dyn Renderer,
        hit: Option<PickHit>,
        modifier: bool,
    ) -> PickAction {
        let Some(atom) = self.resolve_hit(hierarchy, hit) else {
            trace!(?hit, "Pick resolved to no atom");
            return PickAction::Miss;
        };
        match self.level.measurement_kind() {
            Some(kind) => self.measure(hierarchy, renderer, atom, kind),
            None => self.pick_structure(hierarchy, selection, renderer, atom, modifier),
        }
    }

    /// Drops every reference that no longer points into the live tree.
    pub fn forget_stale(&mut self, hierarchy: &Hierarchy) {
        if self.previous_atom.is_some_and(|atom| hierarchy.is_stale(atom)) {
            self.previous_atom = None;
            self.repeat = 0;
        }
        if self.current.is_some_and(|node| hierarchy.is_stale(node)) {
            self.current = None;
        }
        let before = self.cache.len();
        self.cache.retain(|&atom| !hierarchy.is_stale(atom));
        if self.cache.len() != before {
            self.collected = 0;
        }
    }

    fn pick_structure(
        &mut self,
        hierarchy: &Hierarchy,
        selection: &SelectionTree,
        renderer: &dyn Renderer,
        atom: NodeId,
        modifier: bool,
    ) -> PickAction {
        if self.previous_atom == Some(atom) {
            self.repeat += 1;
        } else {
            self.previous_atom = Some(atom);
            self.repeat = 0;
        }

        let target = self.resolve_target(hierarchy, atom);
        self.update_pick_color(hierarchy, renderer, target);

        let Some(node) = target else {
            debug!(level = %self.level, ?atom, "Pick level has no node for this atom");
            return PickAction::NoTarget { atom };
        };
        let Some(path) = hierarchy.path_of(node) else {
            return PickAction::NoTarget { atom };
        };

        if modifier {
            return PickAction::Select {
                node,
                event: selection.toggle(path),
            };
        }
        if selection.is_sole_selection(&path) {
            return PickAction::Unchanged { node };
        }
        PickAction::Select {
            node,
            event: selection.replace_with(path),
        }
    }

    fn resolve_target(&mut self, hierarchy: &Hierarchy, atom: NodeId) -> Option<NodeId> {
        match self.level {
            PickLevel::Atom => Some(atom),
            PickLevel::Bond | PickLevel::Angle | PickLevel::Dihedral => {
                let kind = self.level.valence_kind()?;
                let terms = hierarchy.valence_terms(atom, kind);
                if terms.is_empty() {
                    self.repeat = 0;
                    return None;
                }
                self.repeat %= terms.len();
                Some(terms[self.repeat])
            }
            PickLevel::Residue => hierarchy.nearest_ancestor_of_kind(atom, Kind::Residue),
            PickLevel::Polymer => hierarchy.nearest_ancestor_of_kind(atom, Kind::Polymer),
            PickLevel::Molecule => hierarchy
                .nearest_ancestor_of_kind(atom, Kind::Molecule)
                .or_else(|| hierarchy.nearest_ancestor_of_kind(atom, Kind::Polymer)),
            PickLevel::System => hierarchy.enclosing_system(atom),
            PickLevel::MeasureDistance | PickLevel::MeasureAngle | PickLevel::MeasureDihedral => {
                None
            }
        }
    }

    fn update_pick_color(
        &mut self,
        hierarchy: &Hierarchy,
        renderer: &dyn Renderer,
        target: Option<NodeId>,
    ) {
        if self.current == target {
            return;
        }
        if let Some(previous) = self.current.filter(|&node| hierarchy.contains(node)) {
            renderer.recolor(previous, ColorModel::Revert);
        }
        if let Some(node) = target {
            renderer.recolor(node, ColorModel::Pick);
        }
        self.current = target;
    }

    fn measure(
        &mut self,
        hierarchy: &Hierarchy,
        renderer: &dyn Renderer,
        atom: NodeId,
        kind: MeasurementKind,
    ) -> PickAction {
        let required = kind.required_atoms();
        if self.collected == 0 {
            self.clear_measurement(renderer);
        } else if self.cache.front() == Some(&atom) {
            trace!(?atom, "Ignoring repeated pick of the same atom");
            return PickAction::MeasurementPending {
                collected: self.collected,
                required,
            };
        }

        self.cache.push_front(atom);
        self.cache.truncate(MEASUREMENT_CACHE_CAPACITY);
        self.collected += 1;
        renderer.recolor(atom, ColorModel::Pick);

        if self.collected < required {
            return PickAction::MeasurementPending {
                collected: self.collected,
                required,
            };
        }
        self.collected = 0;

        let atoms: Vec<NodeId> = self.cache.iter().take(required).rev().copied().collect();
        let Some(points) = atoms
            .iter()
            .map(|&a| world_position(hierarchy, renderer, a))
            .collect::<Option<Vec<_>>>()
        else {
            debug!("Measurement references atoms that are no longer attached");
            return PickAction::Miss;
        };

        let value = match kind {
            MeasurementKind::Distance => distance(&points[0], &points[1]),
            MeasurementKind::Angle => bond_angle(&points[0], &points[1], &points[2]),
            MeasurementKind::Dihedral => {
                dihedral_angle(&points[0], &points[1], &points[2], &points[3])
            }
        };
        let measurement = Measurement { kind, atoms, value };
        debug!(%measurement, "Measurement completed");
        PickAction::Measured(measurement)
    }

    fn clear_measurement(&mut self, renderer: &dyn Renderer) {
        for &atom in &self.cache {
            renderer.recolor(atom, ColorModel::Revert);
        }
        self.cache.clear();
        self.collected = 0;
    }
}

/// Atom position in the world frame, with the system's scale left out.
fn world_position(hierarchy: &Hierarchy, renderer: &dyn Renderer, atom: NodeId) -> Option<Point3<f64>> {
    let local = hierarchy.atom_position(atom)?;
    let system = hierarchy.enclosing_system(atom)?;
    Some(renderer.world_transform(system).apply_unscaled(&local))
}
