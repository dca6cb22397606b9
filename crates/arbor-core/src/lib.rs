//! Core shared types for Arbor.
//!
//! This crate is intentionally small and dependency-light: compact ids,
//! type-name helpers, modifier flags, and the cooperative cancellation token
//! used by every long-running build.

mod cancel;
mod ids;
mod modifiers;
mod name;

pub use cancel::CancellationToken;
pub use ids::{FileId, ProjectId};
pub use modifiers::Modifiers;
pub use name::{fold_name, simple_name_of, Name};
