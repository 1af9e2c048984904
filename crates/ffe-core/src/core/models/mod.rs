//! # Core Models Module
//!
//! Data structures describing the molecular tree that selection and picking
//! operate on.
//!
//! ## Overview
//!
//! Every structural element is a [`node::Node`] stored in a single arena owned by
//! [`hierarchy::Hierarchy`]. Parent links are plain keys, children vectors are the
//! owning side, and root-to-node [`path::NodePath`]s are computed from the live
//! links whenever they are needed.
//!
//! ## Key Components
//!
//! - [`ids`] - Arena keys for tree members
//! - [`node`] - The closed set of node kinds and their payloads
//! - [`path`] - Root-to-node chains and ancestry tests
//! - [`hierarchy`] - The tree itself: construction, attach/extract, lookups
//! - [`topology`] - Angle and dihedral derivation from the bond graph
//!
//! ## Usage
//!
//! ```ignore
//! use ffexplorer::core::models::hierarchy::Hierarchy;
//! use ffexplorer::core::models::node::{AtomData, SystemData};
//!
//! let mut tree = Hierarchy::new();
//! let system = tree.create_system("water", SystemData::default());
//! let o = tree.add_atom(system, "O", AtomData::new(Point3::origin()))?;
//! // Attaching goes through `workflows::explorer::Explorer::attach`.
//! ```

pub mod hierarchy;
pub mod ids;
pub mod node;
pub mod path;
pub mod topology;
