#![forbid(unsafe_code)]

//! Token-level Java declaration scanner.
//!
//! This crate recognizes type declarations (`class`/`interface`/`enum`/
//! `record`/`@interface`) together with their modifiers, `extends` reference,
//! and `implements` list, tracking brace nesting so member types land under
//! their container. It is *not* a Java parser: expressions, members, and
//! generics are skipped, and malformed input degrades to "fewer declarations"
//! rather than an error. Hierarchy builds rely on that contract: scanning is
//! a total function from text to declared types.

mod lexer;
mod scan;

pub use scan::{scan_unit, TypeDecl, TypeDeclKind, UnitDecls};
