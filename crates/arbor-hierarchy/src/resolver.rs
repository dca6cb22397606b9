use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::{fold_name, simple_name_of, CancellationToken, Modifiers, Name, ProjectId};
use arbor_project::ClassStub;
use arbor_syntax::{scan_unit, UnitDecls};

use crate::context::EngineContext;
use crate::descriptor::TypeDescriptor;
use crate::error::HierarchyError;
use crate::handle::TypeHandle;
use crate::model::TypeHierarchy;

pub(crate) const UNIVERSAL_ROOT: &str = "java.lang.Object";
pub(crate) const UNIVERSAL_ROOT_SIMPLE: &str = "Object";

/// One type the resolver knows about during a pass.
#[derive(Debug, Clone)]
struct RememberedType {
    descriptor: TypeDescriptor,
    handle: TypeHandle,
    modifiers: Modifiers,
    qualified: Name,
    package: Option<Name>,
    project: Option<ProjectId>,
    binding: Option<SuperBinding>,
}

/// Outcome of resolving one entry's supertype reference.
#[derive(Debug, Clone)]
enum SuperBinding {
    /// Parent is another scratch entry.
    Link(usize),
    /// Parent was resolved and connected by an earlier pass.
    Carried(TypeHandle),
    /// No parent; the type roots.
    Root,
    /// The reference resolved nowhere; its simple name is recorded.
    Missing(Name),
}

/// A type connected by an earlier pass, visible to later passes.
#[derive(Debug, Clone)]
struct CarriedType {
    handle: TypeHandle,
    qualified: Name,
    package: Option<Name>,
}

/// Builds superclass bindings for a working set of units and pushes the
/// edges into a hierarchy model. Scratch state lives per pass; the carry
/// table persists across the passes of one build.
pub(crate) struct Resolver<'r> {
    ctx: &'r EngineContext<'r>,
    /// Focus builds remember classpath stub hits so binary chains keep
    /// resolving; region builds do not, and the subtype roots instead.
    remember_binary: bool,
    scratch: Vec<RememberedType>,
    dedup: HashMap<(Arc<PathBuf>, Name), usize>,
    by_qualified: HashMap<Name, usize>,
    by_simple: HashMap<Name, Vec<usize>>,
    carry: HashMap<Name, CarriedType>,
    carry_by_simple: HashMap<Name, Vec<Name>>,
}

impl<'r> Resolver<'r> {
    pub(crate) fn new(ctx: &'r EngineContext<'r>, remember_binary: bool) -> Self {
        Self {
            ctx,
            remember_binary,
            scratch: Vec::new(),
            dedup: HashMap::new(),
            by_qualified: HashMap::new(),
            by_simple: HashMap::new(),
            carry: HashMap::new(),
            carry_by_simple: HashMap::new(),
        }
    }

    /// Scans `text` and remembers every declared type for `path`. Units
    /// that scan to nothing are skipped silently.
    pub(crate) fn remember_unit_text(
        &mut self,
        project: Option<ProjectId>,
        path: &Arc<PathBuf>,
        text: &str,
    ) {
        let unit = scan_unit(text);
        if unit.is_empty() {
            return;
        }
        self.remember_unit(project, path, &unit);
    }

    fn remember_unit(&mut self, project: Option<ProjectId>, path: &Arc<PathBuf>, unit: &UnitDecls) {
        for (readable, decl) in unit.walk_types() {
            let key = (Arc::clone(path), readable.clone());
            if self.dedup.contains_key(&key) {
                continue;
            }
            let qualified = match &unit.package {
                Some(package) => Name::from(format!("{package}.{readable}")),
                None => readable.clone(),
            };
            let handle = TypeHandle::new(Arc::clone(path), qualified.clone());
            let index = self.scratch.len();
            self.scratch.push(RememberedType {
                descriptor: TypeDescriptor::Source {
                    extends: decl.super_class.clone(),
                },
                handle,
                modifiers: decl.modifiers,
                qualified: qualified.clone(),
                package: unit.package.clone(),
                project,
                binding: None,
            });
            self.dedup.insert(key, index);
            self.by_qualified.entry(qualified.clone()).or_insert(index);
            self.by_simple
                .entry(fold_name(&simple_name_of(&qualified)))
                .or_default()
                .push(index);
        }
    }

    /// Remembers a classpath stub as a binary scratch entry; idempotent per
    /// binary name.
    pub(crate) fn remember_stub(&mut self, stub: &Arc<ClassStub>) -> usize {
        let qualified = stub.binary_name();
        if let Some(&index) = self.by_qualified.get(&qualified) {
            return index;
        }
        let path = Arc::new(stub.pseudo_path());
        let handle = TypeHandle::new(Arc::clone(&path), qualified.clone());
        let package = qualified
            .rsplit_once('.')
            .map(|(prefix, _)| Name::from(prefix));
        let index = self.scratch.len();
        self.scratch.push(RememberedType {
            descriptor: TypeDescriptor::Binary {
                stub: Arc::clone(stub),
            },
            handle,
            modifiers: stub.modifiers(),
            qualified: qualified.clone(),
            package,
            project: None,
            binding: None,
        });
        self.dedup.insert((path, qualified.clone()), index);
        self.by_qualified.entry(qualified.clone()).or_insert(index);
        self.by_simple
            .entry(fold_name(&simple_name_of(&qualified)))
            .or_default()
            .push(index);
        index
    }

    /// Resolves and connects everything remembered so far, then resets the
    /// scratch state whatever the outcome.
    pub(crate) fn resolve_pass(
        &mut self,
        model: &mut TypeHierarchy,
        focus: Option<&TypeHandle>,
        token: &CancellationToken,
    ) -> Result<(), HierarchyError> {
        let result = self.resolve_pass_inner(model, focus, token);
        self.reset_scratch();
        result
    }

    fn resolve_pass_inner(
        &mut self,
        model: &mut TypeHierarchy,
        focus: Option<&TypeHandle>,
        token: &CancellationToken,
    ) -> Result<(), HierarchyError> {
        if self.scratch.is_empty() {
            return Ok(());
        }
        if !self.universal_root_resolvable() {
            return Err(HierarchyError::Environment(format!(
                "{UNIVERSAL_ROOT} is not resolvable from source, index, or classpath stubs"
            )));
        }

        // Worklist: entries appended while resolving chains are picked up
        // by the same loop.
        let mut i = 0;
        while i < self.scratch.len() {
            if token.is_cancelled() {
                return Err(HierarchyError::Cancelled);
            }
            if self.scratch[i].binding.is_none() {
                let binding = self.resolve_entry(i);
                self.scratch[i].binding = Some(binding);
            }
            i += 1;
        }

        let admitted = self.admitted_entries(model, focus);
        let universal_root = self
            .scratch
            .iter()
            .position(|entry| entry.qualified == UNIVERSAL_ROOT);

        let mut connected = 0usize;
        for index in (0..self.scratch.len())
            .filter(|&i| Some(i) != universal_root)
            .chain(universal_root)
        {
            if !admitted[index] {
                continue;
            }
            if token.is_cancelled() {
                return Err(HierarchyError::Cancelled);
            }
            self.connect_entry(model, index);
            connected += 1;
        }
        tracing::debug!(
            remembered = self.scratch.len(),
            connected,
            "resolver pass complete"
        );
        Ok(())
    }

    fn resolve_entry(&mut self, i: usize) -> SuperBinding {
        let Some(reference) = self.scratch[i].descriptor.supertype_ref() else {
            return SuperBinding::Root;
        };
        let binding = self.resolve_reference(i, &reference);
        // A source type may bind the universal root only when its lexical
        // supertype name says so; anything else is an environment-induced
        // false root and counts as missing instead. Binary descriptors are
        // trusted as compiled.
        if self.scratch[i].descriptor.is_source() && self.binds_universal_root(&binding) {
            let lexical = simple_name_of(&reference);
            if lexical != UNIVERSAL_ROOT_SIMPLE {
                return SuperBinding::Missing(lexical);
            }
        }
        binding
    }

    fn resolve_reference(&mut self, referrer: usize, reference: &Name) -> SuperBinding {
        if let Some(index) = self.lookup_scratch(reference, referrer) {
            return SuperBinding::Link(index);
        }
        let referrer_package = self.scratch[referrer].package.clone();
        if let Some(carried) = self.lookup_carry(reference, referrer_package.as_ref()) {
            return SuperBinding::Carried(carried.handle.clone());
        }
        if let Some(index) = self.pull_on_demand(reference, referrer) {
            return SuperBinding::Link(index);
        }
        if let Some(stub) = self.lookup_stub(reference) {
            if self.remember_binary {
                let index = self.remember_stub(&stub);
                return SuperBinding::Link(index);
            }
            return SuperBinding::Root;
        }
        SuperBinding::Missing(simple_name_of(reference))
    }

    fn binds_universal_root(&self, binding: &SuperBinding) -> bool {
        match binding {
            SuperBinding::Link(index) => self.scratch[*index].qualified == UNIVERSAL_ROOT,
            SuperBinding::Carried(handle) => handle.qualified().as_str() == UNIVERSAL_ROOT,
            _ => false,
        }
    }

    fn lookup_scratch(&self, reference: &str, referrer: usize) -> Option<usize> {
        if reference.contains('.') {
            if let Some(&index) = self.by_qualified.get(reference) {
                return Some(index);
            }
            let candidates = self.by_simple.get(&fold_name(&simple_name_of(reference)))?;
            return candidates
                .iter()
                .copied()
                .find(|&index| dotted_suffix_matches(&self.scratch[index].qualified, reference));
        }
        let candidates = self.by_simple.get(&fold_name(reference))?;
        let referrer_package = self.scratch[referrer].package.as_ref();
        let mut exact_any: Option<usize> = None;
        for &index in candidates {
            let entry = &self.scratch[index];
            if simple_name_of(&entry.qualified).as_str() != reference {
                continue;
            }
            if entry.package.as_ref() == referrer_package {
                return Some(index);
            }
            exact_any.get_or_insert(index);
        }
        exact_any.or_else(|| candidates.first().copied())
    }

    fn lookup_carry(
        &self,
        reference: &str,
        referrer_package: Option<&Name>,
    ) -> Option<&CarriedType> {
        if reference.contains('.') {
            if let Some(found) = self.carry.get(reference) {
                return Some(found);
            }
            let names = self
                .carry_by_simple
                .get(&fold_name(&simple_name_of(reference)))?;
            return names.iter().find_map(|qualified| {
                let carried = self.carry.get(qualified)?;
                dotted_suffix_matches(&carried.qualified, reference).then_some(carried)
            });
        }
        let names = self.carry_by_simple.get(&fold_name(reference))?;
        let mut exact_any: Option<&CarriedType> = None;
        for qualified in names {
            let Some(carried) = self.carry.get(qualified) else { continue };
            if simple_name_of(&carried.qualified).as_str() != reference {
                continue;
            }
            if carried.package.as_ref() == referrer_package {
                return Some(carried);
            }
            exact_any.get_or_insert(carried);
        }
        exact_any.or_else(|| names.first().and_then(|qualified| self.carry.get(qualified)))
    }

    /// Looks the reference up through the index and remembers the declaring
    /// unit, pulling out-of-set source supertypes into the pass.
    fn pull_on_demand(&mut self, reference: &Name, referrer: usize) -> Option<usize> {
        let scope = match self.scratch[referrer].project {
            Some(project) => self.ctx.workspace.dependencies_of(project),
            None => self.ctx.workspace.all_project_ids(),
        };
        let hits = self.ctx.index.query_declarations(&scope, reference, true);
        for hit in hits {
            let Some(file) = self.ctx.db.file_id(&hit.path) else { continue };
            let unit = scan_unit(self.ctx.db.file_content(file));
            if unit.is_empty() {
                continue;
            }
            tracing::trace!(
                path = %hit.path.display(),
                reference = reference.as_str(),
                "pulled unit for on-demand supertype resolution"
            );
            self.remember_unit(Some(hit.project), &hit.path, &unit);
            if let Some(index) = self.lookup_scratch(reference, referrer) {
                return Some(index);
            }
        }
        None
    }

    fn lookup_stub(&self, reference: &str) -> Option<Arc<ClassStub>> {
        if reference.contains('.') {
            return self.ctx.stubs.lookup(reference).cloned();
        }
        let bucket = self.ctx.stubs.lookup_simple(reference);
        bucket
            .iter()
            .find(|stub| stub.simple_name() == reference)
            .or_else(|| bucket.first())
            .cloned()
    }

    fn universal_root_resolvable(&self) -> bool {
        if self.by_qualified.contains_key(UNIVERSAL_ROOT) || self.carry.contains_key(UNIVERSAL_ROOT)
        {
            return true;
        }
        let scope = self.ctx.workspace.all_project_ids();
        if !self
            .ctx
            .index
            .query_declarations(&scope, UNIVERSAL_ROOT, true)
            .is_empty()
        {
            return true;
        }
        self.ctx.stubs.contains(UNIVERSAL_ROOT)
    }

    /// Which entries may connect: with a focus, only the focus itself, its
    /// superclass chain, and its transitive subtypes; unrelated types that
    /// merely share a file with a candidate stay out. Without a focus all
    /// entries pass.
    fn admitted_entries(&self, model: &TypeHierarchy, focus: Option<&TypeHandle>) -> Vec<bool> {
        let Some(focus) = focus else {
            return vec![true; self.scratch.len()];
        };
        let focus_chain: BTreeSet<TypeHandle> = self
            .scratch
            .iter()
            .position(|entry| &entry.handle == focus)
            .map(|index| self.chain_handles(model, index))
            .unwrap_or_default();
        (0..self.scratch.len())
            .map(|i| {
                let handle = &self.scratch[i].handle;
                handle == focus
                    || focus_chain.contains(handle)
                    || self.chain_handles(model, i).contains(focus)
            })
            .collect()
    }

    /// The entry's handle plus every handle on its upward chain; a carried
    /// boundary continues through the model's already-connected edges.
    fn chain_handles(&self, model: &TypeHierarchy, start: usize) -> BTreeSet<TypeHandle> {
        let mut visited: BTreeSet<usize> = BTreeSet::new();
        let mut out: BTreeSet<TypeHandle> = BTreeSet::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                break;
            }
            out.insert(self.scratch[current].handle.clone());
            match self.scratch[current].binding.as_ref() {
                Some(SuperBinding::Link(next)) => current = *next,
                Some(SuperBinding::Carried(handle)) => {
                    out.insert(handle.clone());
                    out.extend(model.all_superclasses(handle));
                    break;
                }
                _ => break,
            }
        }
        out
    }

    fn connect_entry(&mut self, model: &mut TypeHierarchy, index: usize) {
        let entry = self.scratch[index].clone();
        model.cache_flags(entry.handle.clone(), entry.modifiers);
        match entry.binding.as_ref() {
            Some(SuperBinding::Link(parent)) => {
                let parent_handle = self.scratch[*parent].handle.clone();
                model.cache_superclass(entry.handle.clone(), parent_handle);
            }
            Some(SuperBinding::Carried(parent_handle)) => {
                model.cache_superclass(entry.handle.clone(), parent_handle.clone());
            }
            Some(SuperBinding::Missing(name)) => {
                model.note_missing_type(name.clone());
                model.add_root_class(entry.handle.clone());
            }
            Some(SuperBinding::Root) | None => {
                model.add_root_class(entry.handle.clone());
            }
        }
        if !self.carry.contains_key(&entry.qualified) {
            self.carry_by_simple
                .entry(fold_name(&simple_name_of(&entry.qualified)))
                .or_default()
                .push(entry.qualified.clone());
        }
        self.carry.insert(
            entry.qualified.clone(),
            CarriedType {
                handle: entry.handle,
                qualified: entry.qualified,
                package: entry.package,
            },
        );
    }

    fn reset_scratch(&mut self) {
        self.scratch.clear();
        self.dedup.clear();
        self.by_qualified.clear();
        self.by_simple.clear();
    }
}

fn dotted_suffix_matches(candidate: &str, reference: &str) -> bool {
    candidate
        .strip_suffix(reference)
        .is_some_and(|head| head.is_empty() || head.ends_with('.'))
}
