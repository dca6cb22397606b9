//! Per-project indexes over type declarations and supertype references.
//!
//! Queries are served from immutable snapshots of each project segment;
//! maintenance submitted while a [`QueryHold`] pins a segment is deferred
//! until the last hold drops, so a walk over query results never sees the
//! segment shift under it.

mod store;

pub use store::{DeclHit, IndexStore, QueryHold, SuperRefHit};
