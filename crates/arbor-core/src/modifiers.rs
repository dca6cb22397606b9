use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// JVM-style access and property flags for a type declaration.
///
/// The bit layout matches classfile `access_flags`, so binary stubs can be
/// carried without translation and source modifiers map onto the same bits.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Modifiers(pub u16);

impl Modifiers {
    pub const PUBLIC: Modifiers = Modifiers(0x0001);
    pub const PRIVATE: Modifiers = Modifiers(0x0002);
    pub const PROTECTED: Modifiers = Modifiers(0x0004);
    pub const STATIC: Modifiers = Modifiers(0x0008);
    pub const FINAL: Modifiers = Modifiers(0x0010);
    pub const INTERFACE: Modifiers = Modifiers(0x0200);
    pub const ABSTRACT: Modifiers = Modifiers(0x0400);
    pub const ANNOTATION: Modifiers = Modifiers(0x2000);
    pub const ENUM: Modifiers = Modifiers(0x4000);

    #[must_use]
    pub const fn empty() -> Self {
        Modifiers(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Modifiers(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    #[must_use]
    pub const fn is_abstract(self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }

    #[must_use]
    pub const fn is_interface(self) -> bool {
        self.contains(Modifiers::INTERFACE)
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modifiers(0x{:04x})", self.0)
    }
}
