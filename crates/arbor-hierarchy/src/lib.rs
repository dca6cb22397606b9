//! Incremental type hierarchy engine.
//!
//! A hierarchy is computed around a focus type ([`EngineContext::hierarchy_for`])
//! or over an explicit region of projects, directories, and files
//! ([`EngineContext::hierarchy_in_region`]). The result tracks superclass
//! edges with their exact inverse, the root set, modifier snapshots, and
//! the supertype names that never resolved. A fine-grained change collector
//! folds later edits into a pending delta per type, and a versioned binary
//! snapshot round-trips the whole structure.
//!
//! Builds borrow their world through [`EngineContext`]; nothing here owns
//! files, projects, stubs, or index state.

mod changes;
mod context;
mod descriptor;
mod discovery;
mod error;
mod handle;
mod model;
mod region;
mod resolver;
mod snapshot;

pub use changes::{EditNotice, NoticeKind, PendingDelta, TypeNotice};
pub use context::{BuildOptions, BuildProgress, EngineContext, ProgressSink, DEFAULT_TICK_BUDGET};
pub use descriptor::TypeDescriptor;
pub use error::HierarchyError;
pub use handle::TypeHandle;
pub use model::{ListenerId, TypeHierarchy};
pub use region::{Region, RegionEntry};
pub use snapshot::SnapshotError;
