//! Seams to the rendering toolkit.
//!
//! The explorer never draws or ray-casts by itself. It asks a [`RayCaster`] what
//! lies under the cursor and tells a [`Renderer`] what to highlight, recolor and
//! release. Both are shared across the UI thread, the viewport thread and the
//! teardown worker, hence the `Send + Sync` bounds.

use crate::core::models::hierarchy::DetachedSystem;
use crate::core::models::ids::NodeId;
use crate::core::utils::geometry::RigidTransform;

/// Color schemes the picking layer applies to individual nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorModel {
    /// Temporary color marking the node under the current pick.
    Pick,
    /// Restore whatever color the node had before it was picked.
    Revert,
}

/// What the ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// A per-atom shape.
    Atom(NodeId),
    /// Batched geometry covering a whole system; the atom is recovered from the
    /// primitive index of the hit.
    System(NodeId),
    /// The orientation axes drawn in the viewport corner.
    AxisMarker,
    /// Anything else the toolkit reports (labels, grids, foreign shapes).
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickHit {
    pub target: HitTarget,
    pub primitive_index: usize,
}

impl PickHit {
    pub fn atom(atom: NodeId) -> Self {
        Self {
            target: HitTarget::Atom(atom),
            primitive_index: 0,
        }
    }

    pub fn batched(system: NodeId, primitive_index: usize) -> Self {
        Self {
            target: HitTarget::System(system),
            primitive_index,
        }
    }
}

pub trait RayCaster: Send + Sync {
    /// Closest geometry under the screen coordinate, or `None` on a miss.
    fn pick_closest(&self, screen_x: i32, screen_y: i32) -> Option<PickHit>;
}

pub trait Renderer: Send + Sync {
    fn set_highlight(&self, node: NodeId, highlighted: bool);

    fn recolor(&self, node: NodeId, color: ColorModel);

    /// Current placement of `system` in the world frame.
    fn world_transform(&self, system: NodeId) -> RigidTransform;

    /// Frees toolkit resources held for a detached system. Called from the
    /// teardown worker, never while the explorer lock is held.
    fn release(&self, system: &DetachedSystem);
}

/// A renderer that draws nothing and places every system at the origin.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn set_highlight(&self, _node: NodeId, _highlighted: bool) {}

    fn recolor(&self, _node: NodeId, _color: ColorModel) {}

    fn world_transform(&self, _system: NodeId) -> RigidTransform {
        RigidTransform::identity()
    }

    fn release(&self, _system: &DetachedSystem) {}
}
