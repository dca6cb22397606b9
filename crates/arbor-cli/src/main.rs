use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use walkdir::WalkDir;

use arbor_core::Modifiers;
use arbor_db::InMemoryFileStore;
use arbor_hierarchy::{BuildOptions, EngineContext, Region, TypeHandle, TypeHierarchy};
use arbor_index::IndexStore;
use arbor_project::{ClasspathStubs, Workspace};
use arbor_syntax::scan_unit;

#[derive(Parser)]
#[command(name = "arbor", version, about = "Arbor type hierarchy inspector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and print the hierarchy around one type
    Hierarchy(HierarchyArgs),
    /// Build and print the hierarchy of a set of files or directories
    Region(RegionArgs),
    /// Load a stored snapshot and print it
    Load(LoadArgs),
}

#[derive(Args)]
struct HierarchyArgs {
    /// Source root to scan for .java units
    root: PathBuf,
    /// Focus type, by simple or dotted name
    focus: String,
    /// Skip subtype discovery and print the superclass chain only
    #[arg(long)]
    supertypes_only: bool,
    /// Write a snapshot of the result to this path
    #[arg(long)]
    store: Option<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RegionArgs {
    /// Source root to scan for .java units
    root: PathBuf,
    /// Region members, relative to the root (defaults to the whole root)
    paths: Vec<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct LoadArgs {
    /// Source root to scan (used to revalidate the focus)
    root: PathBuf,
    /// Snapshot file written by `hierarchy --store`
    snapshot: PathBuf,
    /// Focus type the snapshot must have been computed for
    #[arg(long)]
    focus: Option<String>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    let filter = std::env::var("ARBOR_LOG")
        .ok()
        .and_then(|directives| tracing_subscriber::EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Hierarchy(args) => {
            let loaded = LoadedWorkspace::open(&args.root)?;
            let focus = loaded.find_type(&args.focus)?;
            let options = BuildOptions {
                compute_subtypes: !args.supertypes_only,
                ..BuildOptions::default()
            };
            let h = loaded.ctx().hierarchy_for(&focus, options)?;
            if let Some(store) = &args.store {
                let mut bytes = Vec::new();
                h.store(&mut bytes)?;
                fs::write(store, &bytes)
                    .with_context(|| format!("writing {}", store.display()))?;
                tracing::info!(path = %store.display(), bytes = bytes.len(), "snapshot written");
            }
            let exit = i32::from(!h.missing_types().is_empty());
            print_hierarchy(&h, args.json)?;
            Ok(exit)
        }
        Command::Region(args) => {
            let loaded = LoadedWorkspace::open(&args.root)?;
            let mut region = Region::new();
            if args.paths.is_empty() {
                region = region.directory(&args.root);
            } else {
                for path in &args.paths {
                    let joined = if path.is_absolute() {
                        path.clone()
                    } else {
                        args.root.join(path)
                    };
                    region = if joined.is_dir() {
                        region.directory(joined)
                    } else {
                        region.file(joined)
                    };
                }
            }
            let h = loaded
                .ctx()
                .hierarchy_in_region(region, BuildOptions::default())?;
            let exit = i32::from(!h.missing_types().is_empty());
            print_hierarchy(&h, args.json)?;
            Ok(exit)
        }
        Command::Load(args) => {
            let loaded = LoadedWorkspace::open(&args.root)?;
            let data = fs::read(&args.snapshot)
                .with_context(|| format!("reading {}", args.snapshot.display()))?;
            let expected = match &args.focus {
                Some(name) => Some(loaded.find_type(name)?),
                None => None,
            };
            let h = TypeHierarchy::load(&data, expected.as_ref())?;
            print_hierarchy(&h, args.json)?;
            Ok(0)
        }
    }
}

/// Everything a build borrows, loaded from one source tree as a single
/// project over the built-in classpath stubs.
struct LoadedWorkspace {
    db: InMemoryFileStore,
    workspace: Workspace,
    stubs: ClasspathStubs,
    index: IndexStore,
}

impl LoadedWorkspace {
    fn open(root: &Path) -> Result<Self> {
        let mut db = InMemoryFileStore::new();
        let mut workspace = Workspace::new();
        let project = workspace.add_project(project_name(root), &[]);
        let index = IndexStore::new();

        let mut units = 0usize;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().map_or(true, |ext| ext != "java") {
                continue;
            }
            let text = fs::read_to_string(entry.path())
                .with_context(|| format!("reading {}", entry.path().display()))?;
            let path = Arc::new(entry.path().to_path_buf());
            index.index_unit(project, &path, &scan_unit(&text));
            let file = db.file_id_for_path(entry.path());
            db.set_file_text(file, text);
            workspace.register_file(project, file);
            units += 1;
        }
        if units == 0 {
            bail!("no .java units under {}", root.display());
        }
        tracing::debug!(units, root = %root.display(), "workspace loaded");

        Ok(Self {
            db,
            workspace,
            stubs: ClasspathStubs::with_core_stubs(),
            index,
        })
    }

    fn ctx(&self) -> EngineContext<'_> {
        EngineContext::new(&self.db, &self.workspace, &self.stubs, &self.index)
    }

    /// Resolves a type name to a handle: exact source declarations first,
    /// then case-folded ones, then classpath stubs.
    fn find_type(&self, name: &str) -> Result<TypeHandle> {
        let scope = self.workspace.all_project_ids();
        let mut hits = self.index.query_declarations(&scope, name, true);
        if hits.is_empty() {
            hits = self.index.query_declarations(&scope, name, false);
        }
        if hits.is_empty() {
            if let Some(handle) = self.ctx().binary_handle(name) {
                return Ok(handle);
            }
            if let Some(stub) = self.stubs.lookup_simple(name).first() {
                return Ok(TypeHandle::new(
                    Arc::new(stub.pseudo_path()),
                    stub.binary_name(),
                ));
            }
            bail!("no type named `{name}` in the workspace or on the classpath");
        }
        let mut qualified: Vec<&str> = hits.iter().map(|hit| hit.qualified.as_str()).collect();
        qualified.sort_unstable();
        qualified.dedup();
        if qualified.len() > 1 {
            bail!(
                "type name `{name}` is ambiguous: {}",
                qualified.join(", ")
            );
        }
        let hit = &hits[0];
        Ok(TypeHandle::new(
            Arc::clone(&hit.path),
            hit.qualified.clone(),
        ))
    }
}

fn project_name(root: &Path) -> &str {
    root.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("workspace")
}

#[derive(Serialize)]
struct HierarchyReport {
    focus: Option<String>,
    project: String,
    roots: Vec<TypeNode>,
    missing: Vec<String>,
}

#[derive(Serialize)]
struct TypeNode {
    name: String,
    path: PathBuf,
    modifiers: Modifiers,
    children: Vec<TypeNode>,
}

fn report_of(h: &TypeHierarchy) -> HierarchyReport {
    let mut seen = BTreeSet::new();
    HierarchyReport {
        focus: h.focus().map(|focus| focus.qualified().to_string()),
        project: h.project_label().to_owned(),
        roots: h
            .root_classes()
            .iter()
            .map(|root| node_of(h, root, &mut seen))
            .collect(),
        missing: h.missing_types().iter().map(|name| name.to_string()).collect(),
    }
}

fn node_of(h: &TypeHierarchy, t: &TypeHandle, seen: &mut BTreeSet<TypeHandle>) -> TypeNode {
    // Snapshots from other tools could carry edge cycles; the seen set
    // keeps the rendering finite.
    let children = if seen.insert(t.clone()) {
        h.subclasses(t)
            .iter()
            .map(|child| node_of(h, child, seen))
            .collect()
    } else {
        Vec::new()
    };
    TypeNode {
        name: t.qualified().to_string(),
        path: t.path().to_path_buf(),
        modifiers: h.flags(t).unwrap_or_default(),
        children,
    }
}

fn print_hierarchy(h: &TypeHierarchy, json: bool) -> Result<()> {
    let report = report_of(h);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if let Some(focus) = &report.focus {
        println!("focus: {focus}");
    }
    if !report.project.is_empty() {
        println!("project: {}", report.project);
    }
    for root in &report.roots {
        print_node(root, 0);
    }
    if !report.missing.is_empty() {
        println!("missing: {}", report.missing.join(", "));
    }
    Ok(())
}

fn print_node(node: &TypeNode, depth: usize) {
    println!(
        "{}{}  [{}]",
        "  ".repeat(depth),
        node.name,
        node.path.display()
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
