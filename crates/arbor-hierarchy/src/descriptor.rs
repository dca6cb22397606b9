use std::sync::Arc;

use arbor_core::Name;
use arbor_project::{internal_to_binary, ClassStub};

/// Where the resolver's knowledge about a type's shape comes from.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    /// Declared in a scanned source unit; carries the `extends` reference
    /// as written, if any.
    Source { extends: Option<Name> },
    /// Backed by a classpath stub.
    Binary { stub: Arc<ClassStub> },
    /// Hierarchy-only knowledge with no unit or stub behind it, as when the
    /// change collector compares a cached edge against live source.
    Synthetic { supertype: Option<Name> },
}

impl TypeDescriptor {
    /// The supertype reference this descriptor names, dotted, as the
    /// resolver should look it up.
    #[must_use]
    pub fn supertype_ref(&self) -> Option<Name> {
        match self {
            TypeDescriptor::Source { extends } => extends.clone(),
            TypeDescriptor::Binary { stub } => {
                stub.parent_internal_name().map(internal_to_binary)
            }
            TypeDescriptor::Synthetic { supertype } => supertype.clone(),
        }
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, TypeDescriptor::Binary { .. })
    }

    #[must_use]
    pub fn is_source(&self) -> bool {
        matches!(self, TypeDescriptor::Source { .. })
    }
}
