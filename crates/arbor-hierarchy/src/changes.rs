use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_core::{simple_name_of, Modifiers, Name};
use arbor_syntax::scan_unit;

use crate::context::EngineContext;
use crate::descriptor::TypeDescriptor;
use crate::handle::TypeHandle;
use crate::model::TypeHierarchy;

/// What kind of edit a notice reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Added,
    Removed,
    Changed,
}

/// A single type-level edit notification.
#[derive(Debug, Clone)]
pub struct TypeNotice {
    pub handle: TypeHandle,
    pub kind: NoticeKind,
}

/// Edit notifications as they arrive: one type, or a whole unit whose
/// member notices apply together.
#[derive(Debug, Clone)]
pub enum EditNotice {
    Type(TypeNotice),
    Unit {
        path: Arc<PathBuf>,
        children: Vec<EditNotice>,
    },
}

impl EditNotice {
    #[must_use]
    pub fn added(handle: TypeHandle) -> Self {
        Self::Type(TypeNotice {
            handle,
            kind: NoticeKind::Added,
        })
    }

    #[must_use]
    pub fn removed(handle: TypeHandle) -> Self {
        Self::Type(TypeNotice {
            handle,
            kind: NoticeKind::Removed,
        })
    }

    #[must_use]
    pub fn changed(handle: TypeHandle) -> Self {
        Self::Type(TypeNotice {
            handle,
            kind: NoticeKind::Changed,
        })
    }

    #[must_use]
    pub fn unit(path: Arc<PathBuf>, children: Vec<EditNotice>) -> Self {
        Self::Unit { path, children }
    }
}

/// Net effect collected for one type since the last successful build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDelta {
    Added,
    Removed,
    Changed { supertype: bool, modifiers: bool },
}

impl TypeHierarchy {
    /// Feeds one edit notification into the pending table. Irrelevant
    /// notices drop; consecutive notices for one type merge; listeners
    /// fire when this takes `needs_refresh` from false to true.
    pub fn apply_notice(&mut self, ctx: &EngineContext<'_>, notice: &EditNotice) {
        let had_pending = self.needs_refresh();
        self.apply_notice_inner(ctx, notice);
        if !had_pending && self.needs_refresh() {
            self.fire_listeners();
        }
    }

    fn apply_notice_inner(&mut self, ctx: &EngineContext<'_>, notice: &EditNotice) {
        match notice {
            EditNotice::Unit { children, .. } => {
                for child in children {
                    self.apply_notice_inner(ctx, child);
                }
            }
            EditNotice::Type(notice) => self.apply_type_notice(ctx, notice),
        }
    }

    fn apply_type_notice(&mut self, ctx: &EngineContext<'_>, notice: &TypeNotice) {
        let handle = &notice.handle;
        let pending = self.pending_changes.get(handle).copied();
        if pending.is_none() && !self.is_relevant(handle) {
            tracing::trace!(handle = %handle, kind = ?notice.kind, "edit notice not relevant");
            return;
        }
        let next = match (pending, notice.kind) {
            (None, NoticeKind::Added) => Some(PendingDelta::Added),
            (None, NoticeKind::Removed) => Some(PendingDelta::Removed),
            (None, NoticeKind::Changed) => self.inspect_change(ctx, handle),
            // Added then removed cancels out.
            (Some(PendingDelta::Added), NoticeKind::Removed) => None,
            (Some(PendingDelta::Added), _) => Some(PendingDelta::Added),
            // Removed then re-added reduces to whatever actually differs.
            (Some(PendingDelta::Removed), NoticeKind::Added) => self.inspect_change(ctx, handle),
            (Some(PendingDelta::Removed), _) => Some(PendingDelta::Removed),
            (Some(PendingDelta::Changed { .. }), NoticeKind::Removed) => {
                Some(PendingDelta::Removed)
            }
            (
                Some(PendingDelta::Changed {
                    supertype,
                    modifiers,
                }),
                NoticeKind::Changed,
            ) => match self.inspect_change(ctx, handle) {
                Some(PendingDelta::Changed {
                    supertype: live_super,
                    modifiers: live_modifiers,
                }) => Some(PendingDelta::Changed {
                    supertype: supertype || live_super,
                    modifiers: modifiers || live_modifiers,
                }),
                other => other,
            },
            (Some(PendingDelta::Changed { .. }), NoticeKind::Added) => pending,
        };
        match next {
            Some(delta) => {
                self.pending_changes.insert(handle.clone(), delta);
            }
            None => {
                self.pending_changes.remove(handle);
            }
        }
    }

    /// A notice matters when the type is in the hierarchy, shares a simple
    /// name with a cached superclass (a new declaration could shadow it),
    /// or names a recorded missing supertype.
    fn is_relevant(&self, handle: &TypeHandle) -> bool {
        if self.contains(handle) {
            return true;
        }
        let simple = handle.simple_name();
        if self.missing_types.contains(&simple) {
            return true;
        }
        self.superclass_of
            .values()
            .any(|parent| parent.simple_name() == simple)
    }

    /// Re-inspects a changed type: scans its live declaration and compares
    /// the supertype reference and modifiers against the cached edge and
    /// flags. `None` when nothing differs; `Removed` when the declaration
    /// is gone.
    fn inspect_change(&self, ctx: &EngineContext<'_>, handle: &TypeHandle) -> Option<PendingDelta> {
        let Some((live_super, live_modifiers)) = live_shape(ctx, handle) else {
            return Some(PendingDelta::Removed);
        };
        let cached = TypeDescriptor::Synthetic {
            supertype: self
                .superclass_of
                .get(handle)
                .map(|parent| parent.simple_name()),
        };
        let live_simple = live_super.as_ref().map(|name| simple_name_of(name));
        let supertype = match (cached.supertype_ref(), live_simple) {
            (cached_super, live_super) if cached_super == live_super => false,
            // No cached edge and the live reference is a known missing
            // name: still unresolvable, nothing to update.
            (None, Some(live_super)) => !self.missing_types.contains(&live_super),
            _ => true,
        };
        let modifiers = self.flags_of.get(handle) != Some(&live_modifiers);
        if !supertype && !modifiers {
            return None;
        }
        Some(PendingDelta::Changed {
            supertype,
            modifiers,
        })
    }

    // --- working copies ---------------------------------------------------

    /// Buffers a working-copy notice for its unit; nothing reaches the
    /// pending table until the copy commits.
    pub fn buffer_working_copy(&mut self, path: impl Into<PathBuf>, notice: EditNotice) {
        self.working_copies
            .entry(path.into())
            .or_default()
            .push(notice);
    }

    /// Applies every buffered notice for `path` in arrival order. Listeners
    /// fire at most once per commit.
    pub fn commit_working_copy(&mut self, ctx: &EngineContext<'_>, path: &Path) {
        let Some(batch) = self.working_copies.remove(path) else {
            return;
        };
        let had_pending = self.needs_refresh();
        for notice in &batch {
            self.apply_notice_inner(ctx, notice);
        }
        if !had_pending && self.needs_refresh() {
            self.fire_listeners();
        }
        tracing::debug!(path = %path.display(), notices = batch.len(), "working copy committed");
    }

    /// Drops buffered notices for `path` without applying them.
    pub fn discard_working_copy(&mut self, path: &Path) {
        self.working_copies.remove(path);
    }

    #[must_use]
    pub fn pending_delta(&self, t: &TypeHandle) -> Option<PendingDelta> {
        self.pending_changes.get(t).copied()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending_changes.len()
    }
}

/// The live declaration shape of `handle`: its supertype reference as
/// written and its modifiers. Scans the unit for source handles, falls back
/// to classpath stubs for binary ones. `None` when the declaration is gone.
fn live_shape(ctx: &EngineContext<'_>, handle: &TypeHandle) -> Option<(Option<Name>, Modifiers)> {
    if let Some(file) = ctx.db.file_id(handle.path()) {
        let unit = scan_unit(ctx.db.file_content(file));
        for (readable, decl) in unit.walk_types() {
            let qualified = match &unit.package {
                Some(package) => Name::from(format!("{package}.{readable}")),
                None => readable.clone(),
            };
            if qualified == *handle.qualified() {
                return Some((decl.super_class.clone(), decl.modifiers));
            }
        }
        return None;
    }
    let stub = ctx.stubs.lookup(handle.qualified())?;
    let descriptor = TypeDescriptor::Binary {
        stub: Arc::clone(stub),
    };
    Some((descriptor.supertype_ref(), stub.modifiers()))
}
