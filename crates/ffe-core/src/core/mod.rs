//! # Core Module
//!
//! Stateless building blocks of the explorer: the hierarchical molecular model and
//! the geometry used to measure it.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - The arena-backed tree of systems,
//!   polymers, residues, molecules, atoms and valence terms, plus root-to-node paths
//! - **Geometry** ([`utils::geometry`]) - Rigid transforms and distance, angle and
//!   dihedral measurements
//!
//! Nothing in this layer holds selection or picking state; that lives in
//! [`crate::engine`].

pub mod models;
pub mod utils;
