use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use arbor_core::{fold_name, simple_name_of, Name, ProjectId};
use arbor_syntax::UnitDecls;

/// A declaration site of a type name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DeclPosting {
    path: Arc<PathBuf>,
    /// Readable declared name, `Outer.Inner` for member types.
    name: Name,
    /// Package-qualified form of `name`.
    qualified: Name,
}

/// A site where a name is used as a supertype reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SuperRefPosting {
    path: Arc<PathBuf>,
    /// Declared simple name of the extending type.
    subtype: Name,
    /// The reference as written, possibly qualified.
    supertype: Name,
}

/// Declaration query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclHit {
    pub project: ProjectId,
    pub path: Arc<PathBuf>,
    pub name: Name,
    pub qualified: Name,
}

/// Supertype-reference query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperRefHit {
    pub project: ProjectId,
    pub path: Arc<PathBuf>,
    pub subtype: Name,
    pub supertype: Name,
}

/// Postings of one project, keyed by case-folded simple name.
#[derive(Debug, Default)]
struct SegmentData {
    decls: BTreeMap<Name, Vec<DeclPosting>>,
    super_refs: BTreeMap<Name, Vec<SuperRefPosting>>,
}

impl SegmentData {
    fn remove_path(&mut self, path: &Path) {
        for bucket in self.decls.values_mut() {
            bucket.retain(|p| p.path.as_path() != path);
        }
        for bucket in self.super_refs.values_mut() {
            bucket.retain(|p| p.path.as_path() != path);
        }
        self.decls.retain(|_, bucket| !bucket.is_empty());
        self.super_refs.retain(|_, bucket| !bucket.is_empty());
    }
}

enum SegmentOp {
    Index {
        path: Arc<PathBuf>,
        decls: Vec<(Name, DeclPosting)>,
        super_refs: Vec<(Name, SuperRefPosting)>,
    },
    Remove {
        path: PathBuf,
    },
}

#[derive(Debug)]
struct SegmentHandle {
    project: ProjectId,
    data: RwLock<SegmentData>,
    /// Open query holds on this segment. While non-zero, maintenance queues
    /// in `pending` instead of touching `data`.
    holds: AtomicUsize,
    pending: Mutex<Vec<SegmentOp>>,
}

impl std::fmt::Debug for SegmentOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentOp::Index { path, .. } => write!(f, "Index({})", path.display()),
            SegmentOp::Remove { path } => write!(f, "Remove({})", path.display()),
        }
    }
}

impl SegmentHandle {
    fn new(project: ProjectId) -> Self {
        Self {
            project,
            data: RwLock::new(SegmentData::default()),
            holds: AtomicUsize::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn submit(&self, op: SegmentOp) {
        let mut pending = self.pending.lock().unwrap_or_else(|err| err.into_inner());
        if self.holds.load(Ordering::SeqCst) > 0 {
            tracing::debug!(
                project = self.project.to_raw(),
                ?op,
                "index maintenance deferred while the segment is held"
            );
            pending.push(op);
        } else {
            self.apply(op);
        }
    }

    fn apply(&self, op: SegmentOp) {
        let mut data = self.data.write().unwrap_or_else(|err| err.into_inner());
        match op {
            SegmentOp::Index {
                path,
                decls,
                super_refs,
            } => {
                data.remove_path(&path);
                for (key, posting) in decls {
                    let bucket = data.decls.entry(key).or_default();
                    bucket.push(posting);
                    bucket.sort();
                    bucket.dedup();
                }
                for (key, posting) in super_refs {
                    let bucket = data.super_refs.entry(key).or_default();
                    bucket.push(posting);
                    bucket.sort();
                    bucket.dedup();
                }
            }
            SegmentOp::Remove { path } => data.remove_path(&path),
        }
    }

    fn start_query(&self) {
        self.holds.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_query(&self) {
        let previous = self.holds.fetch_sub(1, Ordering::SeqCst);
        if previous != 1 {
            return;
        }
        let mut pending = self.pending.lock().unwrap_or_else(|err| err.into_inner());
        if pending.is_empty() {
            return;
        }
        let ops = std::mem::take(&mut *pending);
        tracing::debug!(
            project = self.project.to_raw(),
            count = ops.len(),
            "applying deferred index maintenance"
        );
        for op in ops {
            self.apply(op);
        }
    }
}

/// Keeps a set of project segments pinned for the lifetime of a query walk.
#[derive(Debug)]
pub struct QueryHold {
    segments: Vec<Arc<SegmentHandle>>,
}

impl Drop for QueryHold {
    fn drop(&mut self) {
        for segment in &self.segments {
            segment.stop_query();
        }
    }
}

/// All project segments of a session.
#[derive(Debug, Default)]
pub struct IndexStore {
    segments: RwLock<HashMap<ProjectId, Arc<SegmentHandle>>>,
}

impl IndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn segment(&self, project: ProjectId) -> Arc<SegmentHandle> {
        {
            let map = self.segments.read().unwrap_or_else(|err| err.into_inner());
            if let Some(segment) = map.get(&project) {
                return Arc::clone(segment);
            }
        }
        let mut map = self.segments.write().unwrap_or_else(|err| err.into_inner());
        Arc::clone(
            map.entry(project)
                .or_insert_with(|| Arc::new(SegmentHandle::new(project))),
        )
    }

    fn segment_if_exists(&self, project: ProjectId) -> Option<Arc<SegmentHandle>> {
        let map = self.segments.read().unwrap_or_else(|err| err.into_inner());
        map.get(&project).cloned()
    }

    /// (Re)indexes the declarations of one unit under `project`. Replaces
    /// whatever was previously indexed for `path`.
    pub fn index_unit(&self, project: ProjectId, path: &Arc<PathBuf>, unit: &UnitDecls) {
        let mut decls = Vec::new();
        for (readable, _) in unit.walk_types() {
            let qualified = match &unit.package {
                Some(package) => Name::from(format!("{package}.{readable}")),
                None => readable.clone(),
            };
            decls.push((
                fold_name(&simple_name_of(&readable)),
                DeclPosting {
                    path: Arc::clone(path),
                    name: readable,
                    qualified,
                },
            ));
        }
        let mut super_refs = Vec::new();
        for (subtype, supertype) in unit.supertype_refs() {
            super_refs.push((
                fold_name(&simple_name_of(&supertype)),
                SuperRefPosting {
                    path: Arc::clone(path),
                    subtype,
                    supertype,
                },
            ));
        }
        tracing::trace!(
            project = project.to_raw(),
            path = %path.display(),
            decls = decls.len(),
            super_refs = super_refs.len(),
            "indexing unit"
        );
        self.segment(project).submit(SegmentOp::Index {
            path: Arc::clone(path),
            decls,
            super_refs,
        });
    }

    /// Drops everything indexed for `path` under `project`.
    pub fn remove_unit(&self, project: ProjectId, path: &Path) {
        self.segment(project).submit(SegmentOp::Remove {
            path: path.to_path_buf(),
        });
    }

    /// Declaration sites of `name` across `scope`, in scope order. A simple
    /// query matches any package; a qualified query must match the
    /// candidate's dotted tail. `exact_case` tightens the comparison from
    /// case-folded to exact.
    #[must_use]
    pub fn query_declarations(
        &self,
        scope: &[ProjectId],
        name: &str,
        exact_case: bool,
    ) -> Vec<DeclHit> {
        let key = fold_name(&simple_name_of(name));
        let mut hits = Vec::new();
        for &project in scope {
            let Some(segment) = self.segment_if_exists(project) else { continue };
            let data = segment.data.read().unwrap_or_else(|err| err.into_inner());
            let Some(bucket) = data.decls.get(&key) else { continue };
            for posting in bucket {
                if name_matches(name, exact_case, &posting.qualified) {
                    hits.push(DeclHit {
                        project,
                        path: Arc::clone(&posting.path),
                        name: posting.name.clone(),
                        qualified: posting.qualified.clone(),
                    });
                }
            }
        }
        hits
    }

    /// Sites where `name` is referenced as a supertype, across `scope` in
    /// scope order.
    #[must_use]
    pub fn query_supertype_refs(
        &self,
        scope: &[ProjectId],
        name: &str,
        exact_case: bool,
    ) -> Vec<SuperRefHit> {
        let key = fold_name(&simple_name_of(name));
        let mut hits = Vec::new();
        for &project in scope {
            let Some(segment) = self.segment_if_exists(project) else { continue };
            let data = segment.data.read().unwrap_or_else(|err| err.into_inner());
            let Some(bucket) = data.super_refs.get(&key) else { continue };
            for posting in bucket {
                if name_matches(name, exact_case, &posting.supertype) {
                    hits.push(SuperRefHit {
                        project,
                        path: Arc::clone(&posting.path),
                        subtype: posting.subtype.clone(),
                        supertype: posting.supertype.clone(),
                    });
                }
            }
        }
        hits
    }

    /// Distinct spellings of `name`'s simple segment recorded anywhere in
    /// `scope`, the queried spelling first. Discovery expands a name to
    /// these variants and then queries each with `exact_case`.
    #[must_use]
    pub fn name_variants(&self, scope: &[ProjectId], name: &str) -> Vec<Name> {
        let simple = simple_name_of(name);
        let key = fold_name(&simple);
        let mut variants = vec![simple];
        for &project in scope {
            let Some(segment) = self.segment_if_exists(project) else { continue };
            let data = segment.data.read().unwrap_or_else(|err| err.into_inner());
            if let Some(bucket) = data.decls.get(&key) {
                for posting in bucket {
                    let spelling = simple_name_of(&posting.name);
                    if !variants.contains(&spelling) {
                        variants.push(spelling);
                    }
                }
            }
            if let Some(bucket) = data.super_refs.get(&key) {
                for posting in bucket {
                    let spelling = simple_name_of(&posting.supertype);
                    if !variants.contains(&spelling) {
                        variants.push(spelling);
                    }
                }
            }
        }
        variants
    }

    /// Pins every segment in `scope` so maintenance defers until the
    /// returned hold drops. Segments are created as needed, which keeps
    /// writes to not-yet-indexed projects deferred as well.
    #[must_use]
    pub fn begin_query(&self, scope: &[ProjectId]) -> QueryHold {
        let mut segments = Vec::with_capacity(scope.len());
        for &project in scope {
            let segment = self.segment(project);
            segment.start_query();
            segments.push(segment);
        }
        QueryHold { segments }
    }

    /// Whether some query currently holds `project`'s segment.
    #[must_use]
    pub fn in_query(&self, project: ProjectId) -> bool {
        self.segment_if_exists(project)
            .is_some_and(|segment| segment.holds.load(Ordering::SeqCst) > 0)
    }
}

/// A simple query matches the candidate's simple segment; a qualified query
/// must match a dot-boundary suffix of the candidate.
fn name_matches(query: &str, exact_case: bool, candidate: &str) -> bool {
    if query.contains('.') {
        if candidate.len() < query.len() {
            return false;
        }
        let split = candidate.len() - query.len();
        // A tail starting inside a multibyte char cannot equal the query
        // under ascii-only folding.
        if !candidate.is_char_boundary(split) {
            return false;
        }
        let (head, tail) = candidate.split_at(split);
        let tail_ok = if exact_case {
            tail == query
        } else {
            tail.eq_ignore_ascii_case(query)
        };
        tail_ok && (head.is_empty() || head.ends_with('.'))
    } else {
        let candidate_simple = simple_name_of(candidate);
        if exact_case {
            query == candidate_simple.as_str()
        } else {
            query.eq_ignore_ascii_case(&candidate_simple)
        }
    }
}
