use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::{CancellationToken, Modifiers, Name};

use crate::changes::{EditNotice, PendingDelta};
use crate::context::{EngineContext, ProgressSink};
use crate::error::HierarchyError;
use crate::handle::TypeHandle;
use crate::region::Region;

/// Identifies one registered change listener on one hierarchy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// The recipe a hierarchy was built from, kept so `refresh` can re-run it.
#[derive(Debug, Clone)]
pub(crate) enum BuildScope {
    Focus(TypeHandle),
    Region(Region),
}

/// A computed type hierarchy: roots, superclass edges with their maintained
/// inverse, modifier snapshots, and the change-tracking state that keeps the
/// result honest across edits.
///
/// All mutation takes `&mut self`; callers sharing an instance across
/// threads wrap it in a `Mutex`.
pub struct TypeHierarchy {
    pub(crate) scope: Option<BuildScope>,
    pub(crate) compute_subtypes: bool,
    pub(crate) tick_budget: u32,
    /// Owning project name recorded in the snapshot header; empty for
    /// region and binary-focus hierarchies.
    pub(crate) project_label: String,
    pub(crate) exists: bool,

    pub(crate) root_classes: Vec<TypeHandle>,
    pub(crate) superclass_of: BTreeMap<TypeHandle, TypeHandle>,
    /// Exact inverse of `superclass_of`, updated together with it.
    pub(crate) subtypes_of: BTreeMap<TypeHandle, Vec<TypeHandle>>,
    pub(crate) flags_of: BTreeMap<TypeHandle, Modifiers>,
    /// Simple names referenced as a supertype but never resolved.
    pub(crate) missing_types: BTreeSet<Name>,

    pub(crate) pending_changes: BTreeMap<TypeHandle, PendingDelta>,
    pub(crate) working_copies: BTreeMap<PathBuf, Vec<EditNotice>>,
    listeners: Vec<(ListenerId, Box<dyn Fn() + Send>)>,
    next_listener: u32,
}

impl fmt::Debug for TypeHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHierarchy")
            .field("scope", &self.scope)
            .field("exists", &self.exists)
            .field("roots", &self.root_classes.len())
            .field("types", &self.all_classes().len())
            .field("missing", &self.missing_types.len())
            .field("pending", &self.pending_changes.len())
            .finish()
    }
}

impl TypeHierarchy {
    pub(crate) fn new(scope: Option<BuildScope>, compute_subtypes: bool, tick_budget: u32) -> Self {
        Self {
            scope,
            compute_subtypes,
            tick_budget,
            project_label: String::new(),
            exists: false,
            root_classes: Vec::new(),
            superclass_of: BTreeMap::new(),
            subtypes_of: BTreeMap::new(),
            flags_of: BTreeMap::new(),
            missing_types: BTreeSet::new(),
            pending_changes: BTreeMap::new(),
            working_copies: BTreeMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    // --- graph mutation ---------------------------------------------------

    /// Appends to the root set if absent.
    pub fn add_root_class(&mut self, t: TypeHandle) {
        if !self.root_classes.contains(&t) {
            self.root_classes.push(t);
        }
    }

    /// Sets `t`'s superclass to `s` and maintains the inverse map in the
    /// same step. Re-caching over an existing edge unlinks the old inverse
    /// entry first. A self-edge is not cached; the type roots instead.
    pub fn cache_superclass(&mut self, t: TypeHandle, s: TypeHandle) {
        if t == s {
            tracing::debug!(handle = %t, "ignoring self supertype edge");
            self.add_root_class(t);
            return;
        }
        if let Some(old) = self.superclass_of.get(&t).cloned() {
            if let Some(bucket) = self.subtypes_of.get_mut(&old) {
                bucket.retain(|x| x != &t);
                if bucket.is_empty() {
                    self.subtypes_of.remove(&old);
                }
            }
        }
        self.superclass_of.insert(t.clone(), s.clone());
        let bucket = self.subtypes_of.entry(s).or_default();
        if !bucket.contains(&t) {
            bucket.push(t);
        }
    }

    /// Overwrites the modifier snapshot for `t`.
    pub fn cache_flags(&mut self, t: TypeHandle, m: Modifiers) {
        self.flags_of.insert(t, m);
    }

    pub(crate) fn note_missing_type(&mut self, name: Name) {
        self.missing_types.insert(name);
    }

    /// Clears the graph while keeping the build recipe, listeners, and
    /// change-tracking state.
    pub(crate) fn reset_graph(&mut self) {
        self.root_classes.clear();
        self.superclass_of.clear();
        self.subtypes_of.clear();
        self.flags_of.clear();
        self.missing_types.clear();
    }

    // --- queries ----------------------------------------------------------

    /// True iff `t` has a cached superclass or is a root.
    #[must_use]
    pub fn contains(&self, t: &TypeHandle) -> bool {
        self.superclass_of.contains_key(t) || self.root_classes.contains(t)
    }

    #[must_use]
    pub fn superclass(&self, t: &TypeHandle) -> Option<&TypeHandle> {
        self.superclass_of.get(t)
    }

    /// Direct subtypes, sorted.
    #[must_use]
    pub fn subclasses(&self, t: &TypeHandle) -> Vec<TypeHandle> {
        let mut out = self.subtypes_of.get(t).cloned().unwrap_or_default();
        out.sort();
        out
    }

    /// Transitive subtypes of `t` (excluding `t`), breadth-first and
    /// cycle-safe, returned sorted.
    #[must_use]
    pub fn all_subtypes(&self, t: &TypeHandle) -> Vec<TypeHandle> {
        let mut seen: BTreeSet<TypeHandle> = BTreeSet::new();
        let mut queue: VecDeque<TypeHandle> = VecDeque::new();
        seen.insert(t.clone());
        queue.push_back(t.clone());
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            let Some(children) = self.subtypes_of.get(&current) else { continue };
            for child in children {
                if seen.insert(child.clone()) {
                    out.push(child.clone());
                    queue.push_back(child.clone());
                }
            }
        }
        out.sort();
        out
    }

    /// The superclass chain of `t`, nearest first, bounded by a visited set
    /// so adversarial cycles terminate.
    #[must_use]
    pub fn all_superclasses(&self, t: &TypeHandle) -> Vec<TypeHandle> {
        let mut seen: BTreeSet<TypeHandle> = BTreeSet::new();
        seen.insert(t.clone());
        let mut out = Vec::new();
        let mut current = t.clone();
        while let Some(parent) = self.superclass_of.get(&current) {
            if !seen.insert(parent.clone()) {
                break;
            }
            out.push(parent.clone());
            current = parent.clone();
        }
        out
    }

    /// Every type the hierarchy knows, sorted.
    #[must_use]
    pub fn all_classes(&self) -> Vec<TypeHandle> {
        let mut out: BTreeSet<TypeHandle> = self.root_classes.iter().cloned().collect();
        for (sub, sup) in &self.superclass_of {
            out.insert(sub.clone());
            out.insert(sup.clone());
        }
        out.into_iter().collect()
    }

    /// Roots in insertion order.
    #[must_use]
    pub fn root_classes(&self) -> &[TypeHandle] {
        &self.root_classes
    }

    #[must_use]
    pub fn missing_types(&self) -> &BTreeSet<Name> {
        &self.missing_types
    }

    #[must_use]
    pub fn flags(&self, t: &TypeHandle) -> Option<Modifiers> {
        self.flags_of.get(t).copied()
    }

    #[must_use]
    pub fn focus(&self) -> Option<&TypeHandle> {
        match &self.scope {
            Some(BuildScope::Focus(focus)) => Some(focus),
            _ => None,
        }
    }

    /// False while the last (re)build failed or was cancelled.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists
    }

    #[must_use]
    pub fn project_label(&self) -> &str {
        &self.project_label
    }

    /// True iff collected changes invalidate the cached result.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        !self.pending_changes.is_empty()
    }

    // --- rebuild ----------------------------------------------------------

    /// Re-runs the stored build recipe in place. On success the pending
    /// change set clears and `exists()` is true again; on failure the
    /// partial graph stays with `exists() == false` and the error
    /// propagates.
    pub fn refresh(
        &mut self,
        ctx: &EngineContext<'_>,
        token: &CancellationToken,
    ) -> Result<(), HierarchyError> {
        let Some(scope) = self.scope.clone() else {
            return Err(HierarchyError::Environment(
                "hierarchy was loaded without a rebuild recipe".to_owned(),
            ));
        };
        self.rebuild(ctx, &scope, token, None)
    }

    pub(crate) fn rebuild(
        &mut self,
        ctx: &EngineContext<'_>,
        scope: &BuildScope,
        token: &CancellationToken,
        progress: Option<&Arc<dyn ProgressSink>>,
    ) -> Result<(), HierarchyError> {
        self.reset_graph();
        self.exists = false;
        let outcome = match scope {
            BuildScope::Focus(focus) => {
                let focus = focus.clone();
                crate::discovery::build_focus(self, ctx, &focus, token, progress)
            }
            BuildScope::Region(region) => {
                let region = region.clone();
                crate::region::build_region(self, ctx, &region, token)
            }
        };
        match outcome {
            Ok(()) => {
                self.exists = true;
                self.pending_changes.clear();
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // --- listeners --------------------------------------------------------

    /// Registers a callback fired whenever `needs_refresh` transitions from
    /// false to true on this instance.
    pub fn add_listener(&mut self, listener: impl Fn() + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.wrapping_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener, _)| *listener != id);
    }

    pub(crate) fn fire_listeners(&self) {
        for (_, callback) in &self.listeners {
            callback();
        }
    }
}
