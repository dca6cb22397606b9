//! Versioned binary snapshot of a hierarchy.
//!
//! Layout, in order:
//!
//! ```text
//! byte   version                    fatal on mismatch
//! byte   general flags              bit0 = compute_subtypes
//! bytes  project label, '\n'        empty if none
//! bytes  missing names, ','-joined, '\n'
//! repeat type entries:
//!   id_string '\r' flags (ascii) '\r' info byte
//! '\n'
//! repeat edges:
//!   sub index '>' super index '\n'
//! '\n'                              edge-list terminator
//! '\n'                              trailing newline
//! ```
//!
//! Edges refer to type entries by position. The entry carrying the
//! computed-for bit is revalidated against the focus the caller loads for.

use std::collections::BTreeMap;
use std::io::Write;

use arbor_core::{Modifiers, Name};
use thiserror::Error;

use crate::context::DEFAULT_TICK_BUDGET;
use crate::handle::TypeHandle;
use crate::model::{BuildScope, TypeHierarchy};

pub(crate) const FORMAT_VERSION: u8 = 1;
const FLAG_COMPUTE_SUBTYPES: u8 = 0b0000_0001;
const INFO_COMPUTED_FOR: u8 = 0b0000_0001;
const INFO_ROOT: u8 = 0b0000_0010;

/// Snapshot encode/decode failures. All of them are hard errors; a caller
/// that hits one falls back to a fresh compute.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {found} (expected {expected})")]
    VersionMismatch { found: u8, expected: u8 },
    #[error("unexpected end of snapshot data")]
    UnexpectedEof,
    #[error("unexpected byte 0x{byte:02x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },
    #[error("malformed type handle id {0:?}")]
    MalformedHandle(String),
    #[error("type id {0:?} cannot be framed in a snapshot")]
    UnstorableHandle(String),
    #[error("edge refers to type entry {0} outside the table")]
    InvalidIndex(usize),
    #[error("snapshot was computed for {found}, not {expected}")]
    FocusMismatch { expected: String, found: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TypeHierarchy {
    /// Writes the snapshot form of this hierarchy. Nothing is written when
    /// some type id cannot survive the framing.
    pub fn store(&self, sink: &mut dyn Write) -> Result<(), SnapshotError> {
        let types = self.all_classes();
        // Ids are delimited by '\r' and re-split on their tab; an id that
        // does not read back identically must not be written at all.
        for t in &types {
            let id = t.id_string();
            if id.contains(['\r', '\n']) || TypeHandle::from_id_string(&id).as_ref() != Some(t) {
                return Err(SnapshotError::UnstorableHandle(id));
            }
        }

        sink.write_all(&[FORMAT_VERSION])?;
        let mut general = 0u8;
        if self.compute_subtypes {
            general |= FLAG_COMPUTE_SUBTYPES;
        }
        sink.write_all(&[general])?;
        sink.write_all(self.project_label.as_bytes())?;
        sink.write_all(b"\n")?;

        let missing: Vec<&str> = self.missing_types.iter().map(Name::as_str).collect();
        sink.write_all(missing.join(",").as_bytes())?;
        sink.write_all(b"\n")?;

        let index_of: BTreeMap<&TypeHandle, usize> =
            types.iter().enumerate().map(|(i, t)| (t, i)).collect();
        for t in &types {
            sink.write_all(t.id_string().as_bytes())?;
            sink.write_all(b"\r")?;
            let flags = self.flags_of.get(t).copied().unwrap_or_default();
            sink.write_all(flags.bits().to_string().as_bytes())?;
            sink.write_all(b"\r")?;
            let mut info = 0u8;
            if self.focus() == Some(t) {
                info |= INFO_COMPUTED_FOR;
            }
            if self.root_classes.contains(t) {
                info |= INFO_ROOT;
            }
            sink.write_all(&[info])?;
        }
        sink.write_all(b"\n")?;

        for (sub, sup) in &self.superclass_of {
            if let (Some(sub_index), Some(sup_index)) = (index_of.get(sub), index_of.get(sup)) {
                write!(sink, "{sub_index}>{sup_index}")?;
                sink.write_all(b"\n")?;
            }
        }
        sink.write_all(b"\n")?;
        sink.write_all(b"\n")?;
        Ok(())
    }

    /// Parses a snapshot into a fresh hierarchy. When `expected_focus` is
    /// given, the entry marked computed-for must match it. A corrupt stream
    /// yields an error and no hierarchy.
    pub fn load(
        data: &[u8],
        expected_focus: Option<&TypeHandle>,
    ) -> Result<TypeHierarchy, SnapshotError> {
        let mut cursor = Cursor::new(data);

        let version = cursor.u1()?;
        if version != FORMAT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        let general = cursor.u1()?;
        let compute_subtypes = general & FLAG_COMPUTE_SUBTYPES != 0;
        let project_label = cursor.text_field(b'\n')?.to_owned();
        let missing: Vec<Name> = cursor
            .text_field(b'\n')?
            .split(',')
            .filter(|segment| !segment.is_empty())
            .map(Name::from)
            .collect();

        let mut table: Vec<(TypeHandle, u16, u8)> = Vec::new();
        loop {
            match cursor.peek() {
                Some(b'\n') => {
                    cursor.u1()?;
                    break;
                }
                Some(_) => {}
                None => return Err(SnapshotError::UnexpectedEof),
            }
            let id = cursor.text_field(b'\r')?;
            let handle = TypeHandle::from_id_string(id)
                .ok_or_else(|| SnapshotError::MalformedHandle(id.to_owned()))?;
            let flags_at = cursor.pos;
            let flags_value = cursor.number_field(b'\r')?;
            let flags = u16::try_from(flags_value).map_err(|_| SnapshotError::UnexpectedByte {
                byte: data[flags_at],
                offset: flags_at,
            })?;
            let info_at = cursor.pos;
            let info = cursor.u1()?;
            if info & !(INFO_COMPUTED_FOR | INFO_ROOT) != 0 {
                return Err(SnapshotError::UnexpectedByte {
                    byte: info,
                    offset: info_at,
                });
            }
            table.push((handle, flags, info));
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        loop {
            match cursor.peek() {
                Some(b'\n') => {
                    cursor.u1()?;
                    break;
                }
                Some(_) => {}
                None => return Err(SnapshotError::UnexpectedEof),
            }
            let sub = cursor.number_field(b'>')? as usize;
            let sup = cursor.number_field(b'\n')? as usize;
            edges.push((sub, sup));
        }
        cursor.expect(b'\n')?;
        if let Some(byte) = cursor.peek() {
            return Err(SnapshotError::UnexpectedByte {
                byte,
                offset: cursor.pos,
            });
        }

        let computed_for = table
            .iter()
            .find(|(_, _, info)| info & INFO_COMPUTED_FOR != 0)
            .map(|(handle, _, _)| handle.clone());
        if let Some(expected) = expected_focus {
            match &computed_for {
                Some(found) if found == expected => {}
                other => {
                    return Err(SnapshotError::FocusMismatch {
                        expected: expected.id_string(),
                        found: other
                            .as_ref()
                            .map_or_else(|| "<none>".to_owned(), TypeHandle::id_string),
                    })
                }
            }
        }

        let scope = computed_for.map(BuildScope::Focus);
        let mut hierarchy = TypeHierarchy::new(scope, compute_subtypes, DEFAULT_TICK_BUDGET);
        hierarchy.project_label = project_label;
        for name in missing {
            hierarchy.note_missing_type(name);
        }
        for (handle, flags, info) in &table {
            hierarchy.cache_flags(handle.clone(), Modifiers::from_bits(*flags));
            if info & INFO_ROOT != 0 {
                hierarchy.add_root_class(handle.clone());
            }
        }
        for (sub, sup) in edges {
            let sub_handle = table
                .get(sub)
                .map(|(handle, _, _)| handle.clone())
                .ok_or(SnapshotError::InvalidIndex(sub))?;
            let sup_handle = table
                .get(sup)
                .map(|(handle, _, _)| handle.clone())
                .ok_or(SnapshotError::InvalidIndex(sup))?;
            hierarchy.cache_superclass(sub_handle, sup_handle);
        }
        hierarchy.exists = true;
        Ok(hierarchy)
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn u1(&mut self) -> Result<u8, SnapshotError> {
        let byte = *self.data.get(self.pos).ok_or(SnapshotError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<(), SnapshotError> {
        let offset = self.pos;
        let byte = self.u1()?;
        if byte != expected {
            return Err(SnapshotError::UnexpectedByte { byte, offset });
        }
        Ok(())
    }

    /// Consumes up to and including `delim`; returns the bytes before it
    /// and their start offset.
    fn take_until(&mut self, delim: u8) -> Result<(&'a [u8], usize), SnapshotError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == delim {
                let field = &self.data[start..self.pos];
                self.pos += 1;
                return Ok((field, start));
            }
            self.pos += 1;
        }
        Err(SnapshotError::UnexpectedEof)
    }

    fn text_field(&mut self, delim: u8) -> Result<&'a str, SnapshotError> {
        let (field, start) = self.take_until(delim)?;
        std::str::from_utf8(field).map_err(|err| {
            let at = err.valid_up_to();
            SnapshotError::UnexpectedByte {
                byte: field[at],
                offset: start + at,
            }
        })
    }

    /// Non-empty run of ascii digits terminated by `delim`.
    fn number_field(&mut self, delim: u8) -> Result<u32, SnapshotError> {
        let (field, start) = self.take_until(delim)?;
        if field.is_empty() {
            return Err(SnapshotError::UnexpectedByte {
                byte: delim,
                offset: start,
            });
        }
        let mut value: u32 = 0;
        for (i, &byte) in field.iter().enumerate() {
            if !byte.is_ascii_digit() {
                return Err(SnapshotError::UnexpectedByte {
                    byte,
                    offset: start + i,
                });
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                .ok_or(SnapshotError::UnexpectedByte {
                    byte,
                    offset: start + i,
                })?;
        }
        Ok(value)
    }
}
