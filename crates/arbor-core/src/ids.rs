use std::fmt;

/// Compact identifier for a file known to the engine's database.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        FileId(raw)
    }

    #[must_use]
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// Compact identifier for a project inside a workspace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(u32);

impl ProjectId {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        ProjectId(raw)
    }

    #[must_use]
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectId({})", self.0)
    }
}
