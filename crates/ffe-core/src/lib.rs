//! # Force Field Explorer Core Library
//!
//! Selection and synchronization logic for a molecular structure explorer: a
//! hierarchical model of molecular systems, a canonical multi-selection over it,
//! viewport picking with measurement, and change notification for dependent views.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Hierarchy`, `Node`,
//!   `NodePath`) and geometry (`RigidTransform`, distance, angle, dihedral).
//!
//! - **[`engine`]: The Logic Core.** The `SelectionTree` reconciliation algorithm,
//!   the `PickStateMachine`, the `ActiveSystemNotifier`, and the seams to the
//!   rendering toolkit (`RayCaster`, `Renderer`).
//!
//! - **[`workflows`]: The Public API.** `Explorer` ties the engine together behind a
//!   single lock so tree events, viewport picks, attach and detach can arrive from
//!   any thread.

pub mod core;
pub mod engine;
pub mod workflows;
