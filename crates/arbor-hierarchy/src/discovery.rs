use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::{fold_name, CancellationToken, Name, ProjectId};

use crate::context::{BuildProgress, EngineContext, ProgressSink};
use crate::error::HierarchyError;
use crate::handle::TypeHandle;
use crate::model::TypeHierarchy;
use crate::resolver::Resolver;

/// Builds a focus hierarchy by walking the index: a name queue seeded with
/// the focus's simple name expands through supertype references to collect
/// every unit declaring a candidate subtype, then the resolver binds the
/// collected units in dependency order.
pub(crate) fn build_focus(
    model: &mut TypeHierarchy,
    ctx: &EngineContext<'_>,
    focus: &TypeHandle,
    token: &CancellationToken,
    progress: Option<&Arc<dyn ProgressSink>>,
) -> Result<(), HierarchyError> {
    let binary_focus = focus
        .path()
        .extension()
        .is_some_and(|extension| extension == "class");
    let focus_file = ctx.db.file_id(focus.path());
    if !binary_focus && focus_file.is_none() {
        return Err(HierarchyError::Environment(format!(
            "focus unit {} is not in the file store",
            focus.path().display()
        )));
    }
    let focus_project = focus_file.and_then(|file| ctx.workspace.project_of_file(file));

    // Subtypes of a source focus can only live in projects that depend on
    // its own; a binary focus can be extended from anywhere.
    let scope: Vec<ProjectId> = match focus_project {
        Some(project) if !binary_focus => ctx.workspace.dependents_of(project),
        _ => ctx.workspace.all_project_ids(),
    };
    if !binary_focus {
        if let Some(project) = focus_project.and_then(|id| ctx.workspace.project(id)) {
            model.project_label = project.name.clone();
        }
    }

    if !model.compute_subtypes {
        return build_supertypes_only(model, ctx, focus, binary_focus, focus_project, token);
    }

    // Maintenance on these segments defers until the hold drops, so the
    // walk and the resolve passes read one consistent index state.
    let hold = ctx.index.begin_query(&scope);

    let budget = model.tick_budget.max(1);
    let mut steps: u32 = 0;
    let mut queue: VecDeque<Name> = VecDeque::new();
    let mut seen: BTreeSet<Name> = BTreeSet::new();
    let mut unit_paths: Vec<(Option<ProjectId>, Arc<PathBuf>)> = Vec::new();
    let mut seen_paths: BTreeSet<PathBuf> = BTreeSet::new();

    let seed = focus.simple_name();
    seen.insert(fold_name(&seed));
    queue.push_back(seed);

    while let Some(name) = queue.pop_front() {
        steps += 1;
        if let Some(sink) = progress {
            sink.report(BuildProgress {
                current: steps.min(budget),
                total: budget,
            });
        }
        if token.is_cancelled() {
            return Err(HierarchyError::Cancelled);
        }
        // The universal root's subtype fan-out is the whole world; the walk
        // stops at its name.
        if fold_name(&name).as_str() == "object" {
            continue;
        }
        for variant in ctx.index.name_variants(&scope, &name) {
            if token.is_cancelled() {
                return Err(HierarchyError::Cancelled);
            }
            for hit in ctx.index.query_declarations(&scope, &variant, true) {
                if seen_paths.insert(hit.path.as_ref().clone()) {
                    unit_paths.push((Some(hit.project), hit.path));
                }
            }
            for hit in ctx.index.query_supertype_refs(&scope, &variant, true) {
                if seen.insert(fold_name(&hit.subtype)) {
                    queue.push_back(hit.subtype.clone());
                }
            }
        }
    }
    tracing::debug!(steps, units = unit_paths.len(), "discovery walk complete");

    if binary_focus && unit_paths.is_empty() {
        return build_binary_chain(model, ctx, focus, token);
    }

    // The focus unit joins the set even when the index has no posting for
    // it yet.
    if !binary_focus && !seen_paths.contains(focus.path()) {
        unit_paths.push((focus_project, Arc::clone(focus.shared_path())));
    }

    let mut by_project: BTreeMap<Option<ProjectId>, Vec<Arc<PathBuf>>> = BTreeMap::new();
    for (owner, path) in unit_paths {
        by_project.entry(owner).or_default().push(path);
    }
    let mut passes: Vec<(Option<ProjectId>, Vec<Arc<PathBuf>>)> = ctx
        .workspace
        .dependency_order()
        .into_iter()
        .filter_map(|project| {
            by_project
                .remove(&Some(project))
                .map(|paths| (Some(project), paths))
        })
        .collect();
    if let Some(paths) = by_project.remove(&None) {
        passes.push((None, paths));
    }

    let mut resolver = Resolver::new(ctx, true);
    if binary_focus {
        // The focus's own chain comes from stubs and connects first; later
        // passes bind their subtypes to it through the carry table.
        build_chain_into(&mut resolver, model, ctx, focus, token)?;
    }
    for (owner, paths) in passes {
        for path in paths {
            if token.is_cancelled() {
                return Err(HierarchyError::Cancelled);
            }
            let Some(file) = ctx.db.file_id(&path) else { continue };
            resolver.remember_unit_text(owner, &path, ctx.db.file_content(file));
        }
        resolver.resolve_pass(model, Some(focus), token)?;
    }
    drop(hold);
    Ok(())
}

/// The cheap variant when subtypes are not wanted: only the focus unit (or
/// stub chain) resolves, and the admission filter keeps the focus and its
/// superclass chain.
fn build_supertypes_only(
    model: &mut TypeHierarchy,
    ctx: &EngineContext<'_>,
    focus: &TypeHandle,
    binary_focus: bool,
    focus_project: Option<ProjectId>,
    token: &CancellationToken,
) -> Result<(), HierarchyError> {
    if binary_focus {
        return build_binary_chain(model, ctx, focus, token);
    }
    let Some(file) = ctx.db.file_id(focus.path()) else {
        return Err(HierarchyError::Environment(format!(
            "focus unit {} is not in the file store",
            focus.path().display()
        )));
    };
    let mut resolver = Resolver::new(ctx, true);
    let path = Arc::clone(focus.shared_path());
    resolver.remember_unit_text(focus_project, &path, ctx.db.file_content(file));
    resolver.resolve_pass(model, Some(focus), token)
}

/// A binary focus with no source subtypes anywhere reduces to its stub
/// chain up to the universal root.
fn build_binary_chain(
    model: &mut TypeHierarchy,
    ctx: &EngineContext<'_>,
    focus: &TypeHandle,
    token: &CancellationToken,
) -> Result<(), HierarchyError> {
    let mut resolver = Resolver::new(ctx, true);
    build_chain_into(&mut resolver, model, ctx, focus, token)
}

fn build_chain_into(
    resolver: &mut Resolver<'_>,
    model: &mut TypeHierarchy,
    ctx: &EngineContext<'_>,
    focus: &TypeHandle,
    token: &CancellationToken,
) -> Result<(), HierarchyError> {
    let Some(stub) = ctx.stubs.lookup(focus.qualified()) else {
        return Err(HierarchyError::Environment(format!(
            "no classpath stub for {}",
            focus.qualified()
        )));
    };
    resolver.remember_stub(stub);
    resolver.resolve_pass(model, Some(focus), token)
}
