use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::{FileId, ProjectId};
use arbor_db::{Database, InMemoryFileStore};
use arbor_hierarchy::{EngineContext, TypeHandle};
use arbor_index::IndexStore;
use arbor_project::{ClasspathStubs, Workspace};
use arbor_syntax::scan_unit;

/// An in-memory workspace: file store, project graph, core classpath
/// stubs, and a declaration index fed from the same sources.
pub struct Fixture {
    pub db: InMemoryFileStore,
    pub workspace: Workspace,
    pub stubs: ClasspathStubs,
    pub index: IndexStore,
    pub project: ProjectId,
}

impl Fixture {
    pub fn empty() -> Self {
        let mut workspace = Workspace::new();
        let project = workspace.add_project("demo", &[]);
        Self {
            db: InMemoryFileStore::new(),
            workspace,
            stubs: ClasspathStubs::with_core_stubs(),
            index: IndexStore::new(),
            project,
        }
    }

    pub fn single_project(files: &[(&str, &str)]) -> Self {
        let mut fixture = Self::empty();
        for (path, text) in files {
            fixture.add_file(fixture.project, path, text);
        }
        fixture
    }

    pub fn add_project(&mut self, name: &str, depends_on: &[ProjectId]) -> ProjectId {
        self.workspace.add_project(name, depends_on)
    }

    /// Registers, stores, and indexes one unit.
    pub fn add_file(&mut self, project: ProjectId, path: &str, text: &str) -> FileId {
        let file = self.add_file_unindexed(project, path, text);
        self.index
            .index_unit(project, &Arc::new(PathBuf::from(path)), &scan_unit(text));
        file
    }

    /// Registers and stores a unit the index has not seen yet.
    pub fn add_file_unindexed(&mut self, project: ProjectId, path: &str, text: &str) -> FileId {
        let file = self.db.file_id_for_path(path);
        self.db.set_file_text(file, text.to_owned());
        self.workspace.register_file(project, file);
        file
    }

    /// Replaces a unit's text and reindexes it.
    pub fn edit_file(&mut self, path: &str, text: &str) {
        let file = self.db.file_id_for_path(path);
        self.db.set_file_text(file, text.to_owned());
        let project = self
            .workspace
            .project_of_file(file)
            .unwrap_or(self.project);
        self.index
            .index_unit(project, &Arc::new(PathBuf::from(path)), &scan_unit(text));
    }

    /// Drops a unit from the store and the index.
    pub fn remove_file(&mut self, path: &str) {
        let Some(file) = Database::file_id(&self.db, path.as_ref()) else {
            return;
        };
        let project = self
            .workspace
            .project_of_file(file)
            .unwrap_or(self.project);
        self.db.remove_file_text(file);
        self.index.remove_unit(project, path.as_ref());
    }

    pub fn ctx(&self) -> EngineContext<'_> {
        EngineContext::new(&self.db, &self.workspace, &self.stubs, &self.index)
    }

    pub fn handle(&self, path: &str, qualified: &str) -> TypeHandle {
        TypeHandle::new(Arc::new(PathBuf::from(path)), qualified)
    }
}
