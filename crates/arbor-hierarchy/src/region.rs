use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::{CancellationToken, FileId, ProjectId};

use crate::context::EngineContext;
use crate::error::HierarchyError;
use crate::handle::TypeHandle;
use crate::model::TypeHierarchy;
use crate::resolver::Resolver;

/// One member of a region request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionEntry {
    Project(ProjectId),
    Directory(PathBuf),
    File(PathBuf),
}

/// An explicit mix of projects, directories, and single units to build a
/// hierarchy over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub entries: Vec<RegionEntry>,
}

impl Region {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn project(mut self, project: ProjectId) -> Self {
        self.entries.push(RegionEntry::Project(project));
        self
    }

    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.entries.push(RegionEntry::Directory(directory.into()));
        self
    }

    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.entries.push(RegionEntry::File(path.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the hierarchy of every type declared in the region: expand the
/// entries to units, resolve project by project in dependency order, then
/// prune branches that contain no region member.
pub(crate) fn build_region(
    model: &mut TypeHierarchy,
    ctx: &EngineContext<'_>,
    region: &Region,
    token: &CancellationToken,
) -> Result<(), HierarchyError> {
    let mut member_files: Vec<FileId> = Vec::new();
    let mut member_paths: BTreeSet<PathBuf> = BTreeSet::new();

    for entry in &region.entries {
        match entry {
            RegionEntry::Project(project) => {
                if ctx.workspace.project(*project).is_none() {
                    tracing::warn!(project = ?project, "region names an unknown project, skipping");
                    continue;
                }
                for &file in ctx.workspace.files_of(*project) {
                    let Some(path) = ctx.db.file_path(file) else { continue };
                    if member_paths.insert(path.to_path_buf()) {
                        member_files.push(file);
                    }
                }
            }
            RegionEntry::Directory(directory) => {
                let mut matched = false;
                for file in ctx.db.all_file_ids() {
                    let Some(path) = ctx.db.file_path(file) else { continue };
                    if path.starts_with(directory) {
                        matched = true;
                        if member_paths.insert(path.to_path_buf()) {
                            member_files.push(file);
                        }
                    }
                }
                if !matched {
                    tracing::warn!(
                        directory = %directory.display(),
                        "region directory matched no files, skipping"
                    );
                }
            }
            RegionEntry::File(path) => {
                let Some(file) = ctx.db.file_id(path) else {
                    tracing::warn!(path = %path.display(), "region file is unknown, skipping");
                    continue;
                };
                if member_paths.insert(path.clone()) {
                    member_files.push(file);
                }
            }
        }
    }
    tracing::debug!(units = member_files.len(), "region expanded");

    let mut by_project: BTreeMap<Option<ProjectId>, Vec<FileId>> = BTreeMap::new();
    for file in member_files {
        let owner = ctx.workspace.project_of_file(file);
        by_project.entry(owner).or_default().push(file);
    }

    // Dependency providers resolve first so later passes bind cross-project
    // supertypes through the carry table. Files outside any project go last.
    let mut passes: Vec<(Option<ProjectId>, Vec<FileId>)> = ctx
        .workspace
        .dependency_order()
        .into_iter()
        .filter_map(|project| {
            by_project
                .remove(&Some(project))
                .map(|files| (Some(project), files))
        })
        .collect();
    if let Some(files) = by_project.remove(&None) {
        passes.push((None, files));
    }

    let mut resolver = Resolver::new(ctx, false);
    for (project, files) in passes {
        for file in files {
            if token.is_cancelled() {
                return Err(HierarchyError::Cancelled);
            }
            let Some(path) = ctx.db.file_path(file) else { continue };
            let path = Arc::new(path.to_path_buf());
            resolver.remember_unit_text(project, &path, ctx.db.file_content(file));
        }
        resolver.resolve_pass(model, None, token)?;
    }

    prune_to_region(model, &member_paths);
    Ok(())
}

/// Drops branches with no member in the region: a type stays when its own
/// unit is a region member or some transitive subtype's unit is. Missing
/// supertype names stay recorded even when their referrers are pruned.
fn prune_to_region(model: &mut TypeHierarchy, member_paths: &BTreeSet<PathBuf>) {
    let all = model.all_classes();
    let mut kept: BTreeSet<TypeHandle> = BTreeSet::new();
    for t in &all {
        if member_paths.contains(t.path())
            || model
                .all_subtypes(t)
                .iter()
                .any(|sub| member_paths.contains(sub.path()))
        {
            kept.insert(t.clone());
        }
    }
    let dropped = all.len() - kept.len();
    if dropped == 0 {
        return;
    }

    model.root_classes.retain(|t| kept.contains(t));
    let edges: Vec<(TypeHandle, TypeHandle)> = model
        .superclass_of
        .iter()
        .filter(|&(sub, sup)| kept.contains(sub) && kept.contains(sup))
        .map(|(sub, sup)| (sub.clone(), sup.clone()))
        .collect();
    model.superclass_of.clear();
    model.subtypes_of.clear();
    for (sub, sup) in edges {
        model.cache_superclass(sub, sup);
    }
    model.flags_of.retain(|t, _| kept.contains(t));
    tracing::debug!(kept = kept.len(), dropped, "pruned hierarchy to region members");
}
