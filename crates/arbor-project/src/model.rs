use std::collections::{HashMap, HashSet};

use arbor_core::{FileId, ProjectId};

/// One buildable unit of the workspace.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Direct dependencies, in declaration order.
    pub depends_on: Vec<ProjectId>,
    /// Source files owned by this project, in registration order.
    pub files: Vec<FileId>,
}

/// All projects of a session, with file ownership. Project ids are dense
/// and minted in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    projects: Vec<Project>,
    file_owner: HashMap<FileId, ProjectId>,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&mut self, name: &str, depends_on: &[ProjectId]) -> ProjectId {
        let id = ProjectId::from_raw(self.projects.len() as u32);
        self.projects.push(Project {
            id,
            name: name.to_owned(),
            depends_on: depends_on.to_vec(),
            files: Vec::new(),
        });
        id
    }

    /// Registers `file` under `project`. A file belongs to at most one
    /// project; re-registering moves it.
    pub fn register_file(&mut self, project: ProjectId, file: FileId) {
        if let Some(previous) = self.file_owner.insert(file, project) {
            if previous == project {
                return;
            }
            if let Some(p) = self.project_mut(previous) {
                p.files.retain(|f| *f != file);
            }
        }
        if let Some(p) = self.project_mut(project) {
            p.files.push(file);
        }
    }

    #[must_use]
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(id.to_raw() as usize)
    }

    fn project_mut(&mut self, id: ProjectId) -> Option<&mut Project> {
        self.projects.get_mut(id.to_raw() as usize)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    #[must_use]
    pub fn project_named(&self, name: &str) -> Option<ProjectId> {
        self.projects.iter().find(|p| p.name == name).map(|p| p.id)
    }

    #[must_use]
    pub fn project_of_file(&self, file: FileId) -> Option<ProjectId> {
        self.file_owner.get(&file).copied()
    }

    #[must_use]
    pub fn files_of(&self, project: ProjectId) -> &[FileId] {
        self.project(project).map_or(&[], |p| p.files.as_slice())
    }

    #[must_use]
    pub fn all_project_ids(&self) -> Vec<ProjectId> {
        self.projects.iter().map(|p| p.id).collect()
    }

    /// All projects ordered so that every project comes after its
    /// dependencies. Ties break on raw id, so the order is deterministic.
    /// Projects on a dependency cycle are appended in id order.
    #[must_use]
    pub fn dependency_order(&self) -> Vec<ProjectId> {
        let mut done: HashSet<ProjectId> = HashSet::new();
        let mut order = Vec::with_capacity(self.projects.len());
        loop {
            let mut advanced = false;
            for project in &self.projects {
                if done.contains(&project.id) {
                    continue;
                }
                let ready = project
                    .depends_on
                    .iter()
                    .all(|dep| done.contains(dep) || self.project(*dep).is_none());
                if ready {
                    done.insert(project.id);
                    order.push(project.id);
                    advanced = true;
                }
            }
            if !advanced {
                break;
            }
        }
        for project in &self.projects {
            if !done.contains(&project.id) {
                order.push(project.id);
            }
        }
        order
    }

    /// `project` plus everything that transitively depends on it, sorted by
    /// raw id.
    #[must_use]
    pub fn dependents_of(&self, project: ProjectId) -> Vec<ProjectId> {
        let mut out: HashSet<ProjectId> = HashSet::new();
        out.insert(project);
        loop {
            let mut grew = false;
            for candidate in &self.projects {
                if out.contains(&candidate.id) {
                    continue;
                }
                if candidate.depends_on.iter().any(|dep| out.contains(dep)) {
                    out.insert(candidate.id);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        let mut out: Vec<ProjectId> = out.into_iter().collect();
        out.sort_by_key(|id| id.to_raw());
        out
    }

    /// `project` followed by its transitive dependencies in breadth-first
    /// order. This is the search order for on-demand declaration lookups.
    #[must_use]
    pub fn dependencies_of(&self, project: ProjectId) -> Vec<ProjectId> {
        let mut seen: HashSet<ProjectId> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(project);
        seen.insert(project);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            let Some(p) = self.project(current) else { continue };
            for dep in &p.depends_on {
                if seen.insert(*dep) {
                    queue.push_back(*dep);
                }
            }
        }
        order
    }
}
