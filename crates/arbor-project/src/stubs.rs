use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::{fold_name, Modifiers, Name};
use once_cell::sync::Lazy;

/// Converts a JVM internal name (`java/lang/Object`) to the dotted binary
/// name (`java.lang.Object`).
#[must_use]
pub fn internal_to_binary(internal: &str) -> Name {
    Name::from(internal.replace('/', "."))
}

/// Shape of one compiled class on the classpath, as a descriptor reader
/// would report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassStub {
    /// JVM internal form, `java/util/ArrayList`.
    pub internal_name: String,
    pub access_flags: u16,
    pub super_internal_name: Option<String>,
    pub interfaces: Vec<String>,
}

impl ClassStub {
    #[must_use]
    pub fn binary_name(&self) -> Name {
        internal_to_binary(&self.internal_name)
    }

    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.internal_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.internal_name)
    }

    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        Modifiers::from_bits(self.access_flags)
    }

    /// The supertype edge the hierarchy follows. Compiled interfaces name
    /// `java/lang/Object` as their superclass and keep their `extends`
    /// entries in `interfaces`, so for interfaces the first entry there wins.
    #[must_use]
    pub fn parent_internal_name(&self) -> Option<&str> {
        if self.modifiers().is_interface() {
            if let Some(first) = self.interfaces.first() {
                return Some(first);
            }
        }
        self.super_internal_name.as_deref()
    }

    /// Classpath entries have no source file; hierarchy handles use this
    /// stable pseudo-path instead.
    #[must_use]
    pub fn pseudo_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.class", self.internal_name))
    }
}

/// Stubs visible on the classpath, addressable by binary name and by
/// case-folded simple name.
#[derive(Debug, Clone, Default)]
pub struct ClasspathStubs {
    by_binary_name: HashMap<Name, Arc<ClassStub>>,
    by_simple_name: HashMap<Name, Vec<Arc<ClassStub>>>,
}

impl ClasspathStubs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A classpath preloaded with the core `java.lang`, `java.io` and
    /// `java.util` shapes the resolver leans on, `java.lang.Object` first
    /// among them.
    #[must_use]
    pub fn with_core_stubs() -> Self {
        CORE.clone()
    }

    pub fn add_stub(&mut self, stub: ClassStub) {
        let stub = Arc::new(stub);
        let binary = stub.binary_name();
        if let Some(previous) = self.by_binary_name.insert(binary, Arc::clone(&stub)) {
            let folded = fold_name(previous.simple_name());
            if let Some(bucket) = self.by_simple_name.get_mut(&folded) {
                bucket.retain(|s| s.internal_name != previous.internal_name);
            }
        }
        self.by_simple_name
            .entry(fold_name(stub.simple_name()))
            .or_default()
            .push(stub);
    }

    #[must_use]
    pub fn lookup(&self, binary_name: &str) -> Option<&Arc<ClassStub>> {
        self.by_binary_name.get(binary_name)
    }

    /// All stubs whose simple name folds to `simple_name`.
    #[must_use]
    pub fn lookup_simple(&self, simple_name: &str) -> &[Arc<ClassStub>] {
        self.by_simple_name
            .get(&fold_name(simple_name))
            .map_or(&[], |bucket| bucket.as_slice())
    }

    #[must_use]
    pub fn contains(&self, binary_name: &str) -> bool {
        self.by_binary_name.contains_key(binary_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_binary_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_binary_name.is_empty()
    }

    pub fn stubs(&self) -> impl Iterator<Item = &Arc<ClassStub>> {
        self.by_binary_name.values()
    }
}

const ACC_PUBLIC: u16 = Modifiers::PUBLIC.bits();
const ACC_FINAL: u16 = Modifiers::FINAL.bits();
const ACC_ABSTRACT: u16 = Modifiers::ABSTRACT.bits();
// Compiled interfaces always carry ABSTRACT alongside INTERFACE.
const ACC_INTERFACE: u16 = Modifiers::INTERFACE.bits() | Modifiers::ABSTRACT.bits();

/// (internal name, superclass, interfaces, access flags)
const CORE_CLASSES: &[(&str, Option<&str>, &[&str], u16)] = &[
    ("java/lang/Object", None, &[], ACC_PUBLIC),
    (
        "java/lang/String",
        Some("java/lang/Object"),
        &[
            "java/io/Serializable",
            "java/lang/CharSequence",
            "java/lang/Comparable",
        ],
        ACC_PUBLIC | ACC_FINAL,
    ),
    ("java/lang/CharSequence", Some("java/lang/Object"), &[], ACC_INTERFACE | ACC_PUBLIC),
    ("java/lang/Comparable", Some("java/lang/Object"), &[], ACC_INTERFACE | ACC_PUBLIC),
    ("java/lang/Cloneable", Some("java/lang/Object"), &[], ACC_INTERFACE | ACC_PUBLIC),
    ("java/io/Serializable", Some("java/lang/Object"), &[], ACC_INTERFACE | ACC_PUBLIC),
    (
        "java/lang/Number",
        Some("java/lang/Object"),
        &["java/io/Serializable"],
        ACC_PUBLIC | ACC_ABSTRACT,
    ),
    (
        "java/lang/Integer",
        Some("java/lang/Number"),
        &["java/lang/Comparable"],
        ACC_PUBLIC | ACC_FINAL,
    ),
    (
        "java/lang/Long",
        Some("java/lang/Number"),
        &["java/lang/Comparable"],
        ACC_PUBLIC | ACC_FINAL,
    ),
    (
        "java/lang/Enum",
        Some("java/lang/Object"),
        &["java/lang/Comparable", "java/io/Serializable"],
        ACC_PUBLIC | ACC_ABSTRACT,
    ),
    ("java/lang/Record", Some("java/lang/Object"), &[], ACC_PUBLIC | ACC_ABSTRACT),
    (
        "java/lang/Throwable",
        Some("java/lang/Object"),
        &["java/io/Serializable"],
        ACC_PUBLIC,
    ),
    ("java/lang/Exception", Some("java/lang/Throwable"), &[], ACC_PUBLIC),
    ("java/lang/RuntimeException", Some("java/lang/Exception"), &[], ACC_PUBLIC),
    (
        "java/lang/IllegalArgumentException",
        Some("java/lang/RuntimeException"),
        &[],
        ACC_PUBLIC,
    ),
    ("java/lang/Error", Some("java/lang/Throwable"), &[], ACC_PUBLIC),
    ("java/lang/Iterable", Some("java/lang/Object"), &[], ACC_INTERFACE | ACC_PUBLIC),
    (
        "java/util/Collection",
        Some("java/lang/Object"),
        &["java/lang/Iterable"],
        ACC_INTERFACE | ACC_PUBLIC,
    ),
    (
        "java/util/List",
        Some("java/lang/Object"),
        &["java/util/Collection"],
        ACC_INTERFACE | ACC_PUBLIC,
    ),
    (
        "java/util/Set",
        Some("java/lang/Object"),
        &["java/util/Collection"],
        ACC_INTERFACE | ACC_PUBLIC,
    ),
    ("java/util/Map", Some("java/lang/Object"), &[], ACC_INTERFACE | ACC_PUBLIC),
    ("java/util/RandomAccess", Some("java/lang/Object"), &[], ACC_INTERFACE | ACC_PUBLIC),
    (
        "java/util/AbstractCollection",
        Some("java/lang/Object"),
        &["java/util/Collection"],
        ACC_PUBLIC | ACC_ABSTRACT,
    ),
    (
        "java/util/AbstractList",
        Some("java/util/AbstractCollection"),
        &["java/util/List"],
        ACC_PUBLIC | ACC_ABSTRACT,
    ),
    (
        "java/util/ArrayList",
        Some("java/util/AbstractList"),
        &[
            "java/util/List",
            "java/util/RandomAccess",
            "java/lang/Cloneable",
            "java/io/Serializable",
        ],
        ACC_PUBLIC,
    ),
];

static CORE: Lazy<ClasspathStubs> = Lazy::new(|| {
    let mut stubs = ClasspathStubs::default();
    for (internal, super_internal, interfaces, flags) in CORE_CLASSES {
        stubs.add_stub(ClassStub {
            internal_name: (*internal).to_owned(),
            access_flags: *flags,
            super_internal_name: super_internal.map(str::to_owned),
            interfaces: interfaces.iter().map(|s| (*s).to_owned()).collect(),
        });
    }
    stubs
});
