//! Ember Engine Core
//!
//! Contains the fundamental simulation systems:
//! - Entity Component System (ECS) with a runtime type registry
//! - Append-only event pipes with masked readers
//! - Tag-constrained system dispatcher
//! - Runtime field reflection

pub mod ecs;
pub mod reflect;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
