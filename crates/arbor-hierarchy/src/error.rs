use thiserror::Error;

use crate::snapshot::SnapshotError;

/// Failures that abort a hierarchy build. Per-unit and per-candidate
/// problems (malformed source, unresolvable supertypes) never surface here;
/// they degrade to missing entries instead.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// The binding environment is unusable: the universal root type cannot
    /// be resolved through any source, carry, index, or classpath channel.
    #[error("binding environment unusable: {0}")]
    Environment(String),

    /// The build's cancellation token was triggered.
    #[error("hierarchy build cancelled")]
    Cancelled,

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl HierarchyError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HierarchyError::Cancelled)
    }
}
