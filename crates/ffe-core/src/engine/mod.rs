//! # Engine Module
//!
//! Stateful selection and picking logic layered on top of the [`crate::core`] model.
//!
//! ## Overview
//!
//! The engine keeps one canonical, non-redundant selection over the molecular
//! tree, turns viewport clicks into selections or measurements, and tells
//! dependent views what changed. None of its types lock anything themselves;
//! [`crate::workflows::explorer::Explorer`] serializes access to them.
//!
//! ## Architecture
//!
//! - **Selection** ([`selection`]) - Reconciles tree-widget add/remove deltas into
//!   the canonical path set and tracks the active system
//! - **Picking** ([`picking`]) - Pick levels, repeat-pick cycling through valence
//!   terms, and distance/angle/dihedral measurement
//! - **Notification** ([`notifier`]) - Observer fan-out for selection and
//!   active-system changes
//! - **Collaborators** ([`collaborators`]) - Traits for the ray caster and the renderer
//! - **Teardown** ([`teardown`]) - Background release of detached systems
//! - **Configuration** ([`config`]) - Highlight model, default pick level and friends
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod collaborators;
pub mod config;
pub mod error;
pub mod notifier;
pub mod picking;
pub mod selection;
pub mod teardown;
