//! # Workflows Module
//!
//! The public entry point of the library.
//!
//! ## Overview
//!
//! [`explorer::Explorer`] owns the molecular tree, the selection, the pick state
//! and the observer list behind a single lock. User interface code feeds it
//! tree-widget deltas and viewport clicks from whatever thread it likes; the
//! explorer serializes them, keeps the renderer's highlights in step, and tells
//! observers what changed.
//!
//! ## Usage
//!
//! ```ignore
//! let explorer = Explorer::new(config, renderer, ray_caster)?;
//! explorer.subscribe(status_bar);
//! let system = explorer.edit(|tree| build_water(tree))?;
//! explorer.attach(system)?;
//! explorer.pick(320, 240, false);
//! ```

pub mod explorer;
