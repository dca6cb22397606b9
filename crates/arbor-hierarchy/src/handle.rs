use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_core::{simple_name_of, Name};

/// Stable identity of a declared type: the defining unit's path plus the
/// dotted qualified name. Two handles with the same path and name are the
/// same type. Cloning is cheap; the path is shared.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeHandle {
    path: Arc<PathBuf>,
    qualified: Name,
}

impl TypeHandle {
    pub fn new(path: Arc<PathBuf>, qualified: impl Into<Name>) -> Self {
        Self {
            path,
            qualified: qualified.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn shared_path(&self) -> &Arc<PathBuf> {
        &self.path
    }

    #[must_use]
    pub fn qualified(&self) -> &Name {
        &self.qualified
    }

    #[must_use]
    pub fn simple_name(&self) -> Name {
        simple_name_of(&self.qualified)
    }

    /// Externalizable identifier: path and qualified name joined by a tab.
    /// The inverse of [`TypeHandle::from_id_string`].
    #[must_use]
    pub fn id_string(&self) -> String {
        format!("{}\t{}", self.path.display(), self.qualified)
    }

    /// Parses an [`TypeHandle::id_string`] form. `None` when the separator
    /// is absent or either part is empty.
    #[must_use]
    pub fn from_id_string(id: &str) -> Option<TypeHandle> {
        let (path, qualified) = id.split_once('\t')?;
        if path.is_empty() || qualified.is_empty() {
            return None;
        }
        Some(TypeHandle {
            path: Arc::new(PathBuf::from(path)),
            qualified: Name::from(qualified),
        })
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({} @ {})", self.qualified, self.path.display())
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified)
    }
}
