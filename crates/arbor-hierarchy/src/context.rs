use std::fmt;
use std::sync::Arc;

use arbor_core::CancellationToken;
use arbor_db::Database;
use arbor_index::IndexStore;
use arbor_project::{ClasspathStubs, Workspace};

use crate::error::HierarchyError;
use crate::handle::TypeHandle;
use crate::model::{BuildScope, TypeHierarchy};
use crate::region::Region;

/// Upper bound on discovery progress ticks reported per build.
pub const DEFAULT_TICK_BUDGET: u32 = 256;

/// One progress report from a running build. `current` never exceeds
/// `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildProgress {
    pub current: u32,
    pub total: u32,
}

/// Receives progress reports during discovery builds. Reports arrive on
/// the building thread; implementations must not call back into the build.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: BuildProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(BuildProgress) + Send + Sync,
{
    fn report(&self, progress: BuildProgress) {
        self(progress)
    }
}

/// Per-build knobs. The default computes subtypes with the standard tick
/// budget, an unset token, and no progress sink.
#[derive(Clone)]
pub struct BuildOptions {
    pub compute_subtypes: bool,
    pub tick_budget: u32,
    pub token: CancellationToken,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            compute_subtypes: true,
            tick_budget: DEFAULT_TICK_BUDGET,
            token: CancellationToken::new(),
            progress: None,
        }
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("compute_subtypes", &self.compute_subtypes)
            .field("tick_budget", &self.tick_budget)
            .field("cancelled", &self.token.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Borrowed view of everything a build reads: the file store, the project
/// graph, classpath stubs, and the declaration index. Builds never own
/// these; the caller decides their lifetime and sharing.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub db: &'a dyn Database,
    pub workspace: &'a Workspace,
    pub stubs: &'a ClasspathStubs,
    pub index: &'a IndexStore,
}

impl fmt::Debug for EngineContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("projects", &self.workspace.all_project_ids().len())
            .field("stubs", &self.stubs.len())
            .finish()
    }
}

impl<'a> EngineContext<'a> {
    pub fn new(
        db: &'a dyn Database,
        workspace: &'a Workspace,
        stubs: &'a ClasspathStubs,
        index: &'a IndexStore,
    ) -> Self {
        Self {
            db,
            workspace,
            stubs,
            index,
        }
    }

    /// Builds the hierarchy around one focus type. On failure no hierarchy
    /// is returned; `refresh` on an existing instance is the path that
    /// keeps a partial graph around.
    pub fn hierarchy_for(
        &self,
        focus: &TypeHandle,
        options: BuildOptions,
    ) -> Result<TypeHierarchy, HierarchyError> {
        let scope = BuildScope::Focus(focus.clone());
        let mut hierarchy = TypeHierarchy::new(
            Some(scope.clone()),
            options.compute_subtypes,
            options.tick_budget,
        );
        hierarchy.rebuild(self, &scope, &options.token, options.progress.as_ref())?;
        Ok(hierarchy)
    }

    /// Builds the hierarchy of every type declared inside `region`.
    pub fn hierarchy_in_region(
        &self,
        region: Region,
        options: BuildOptions,
    ) -> Result<TypeHierarchy, HierarchyError> {
        let scope = BuildScope::Region(region);
        let mut hierarchy = TypeHierarchy::new(
            Some(scope.clone()),
            options.compute_subtypes,
            options.tick_budget,
        );
        hierarchy.rebuild(self, &scope, &options.token, options.progress.as_ref())?;
        Ok(hierarchy)
    }

    /// Handle for a classpath type, addressed by binary name.
    #[must_use]
    pub fn binary_handle(&self, binary_name: &str) -> Option<TypeHandle> {
        let stub = self.stubs.lookup(binary_name)?;
        Some(TypeHandle::new(
            Arc::new(stub.pseudo_path()),
            stub.binary_name(),
        ))
    }
}
