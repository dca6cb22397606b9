use smol_str::SmolStr;

/// A type name. Cheap to clone; most names fit inline.
pub type Name = SmolStr;

/// Last segment of a possibly-qualified type name.
///
/// Source references use `.` separators, binary descriptors use `/`, and
/// nested binary names use `$`; all three delimit.
#[must_use]
pub fn simple_name_of(name: &str) -> Name {
    match name.rsplit(['.', '/', '$']).next() {
        Some(simple) if !simple.is_empty() => Name::from(simple),
        _ => Name::from(name),
    }
}

/// Case-folded key used for index lookups and synonym expansion.
///
/// The index keys postings by this fold and stores the written name in the
/// posting, so one lookup yields every case variant of a name.
#[must_use]
pub fn fold_name(name: &str) -> Name {
    Name::from(name.to_ascii_lowercase())
}
