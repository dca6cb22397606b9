use arbor_core::{Modifiers, Name};

use crate::lexer::{lex, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// One type declaration, with member types nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub kind: TypeDeclKind,
    pub name: Name,
    pub modifiers: Modifiers,
    /// The `extends` reference as written (possibly dotted, generics
    /// stripped). For interfaces this is the first `extends` entry.
    pub super_class: Option<Name>,
    /// `implements` entries; for interfaces, `extends` entries past the first.
    pub interfaces: Vec<Name>,
    pub nested: Vec<TypeDecl>,
}

/// Declarations of one source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitDecls {
    pub package: Option<Name>,
    pub types: Vec<TypeDecl>,
}

impl UnitDecls {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Pre-order walk of every declared type with its dotted readable name
    /// (`Outer.Inner` for member types).
    #[must_use]
    pub fn walk_types(&self) -> Vec<(Name, &TypeDecl)> {
        let mut out = Vec::new();
        for decl in &self.types {
            walk(decl, None, &mut out);
        }
        out
    }

    /// `(declared name, supertype reference as written)` pairs for indexing,
    /// nested types included.
    #[must_use]
    pub fn supertype_refs(&self) -> Vec<(Name, Name)> {
        let mut out = Vec::new();
        for (_, decl) in self.walk_types() {
            if let Some(super_class) = &decl.super_class {
                out.push((decl.name.clone(), super_class.clone()));
            }
            for iface in &decl.interfaces {
                out.push((decl.name.clone(), iface.clone()));
            }
        }
        out
    }
}

fn walk<'a>(decl: &'a TypeDecl, prefix: Option<&str>, out: &mut Vec<(Name, &'a TypeDecl)>) {
    let readable: Name = match prefix {
        Some(prefix) => Name::from(format!("{prefix}.{}", decl.name)),
        None => decl.name.clone(),
    };
    out.push((readable.clone(), decl));
    for nested in &decl.nested {
        walk(nested, Some(&readable), out);
    }
}

/// Scan one source unit into its declared types. Total: malformed input
/// yields fewer declarations, never an error.
#[must_use]
pub fn scan_unit(text: &str) -> UnitDecls {
    Scanner::new(text).run()
}

struct Scanner<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    package: Option<Name>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            tokens: lex(text),
            pos: 0,
            package: None,
        }
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| t.kind == kind)
    }

    fn run(mut self) -> UnitDecls {
        let mut top: Vec<TypeDecl> = Vec::new();
        // Type declarations whose body is currently open, with the brace
        // depth their body lives at.
        let mut open: Vec<(usize, TypeDecl)> = Vec::new();
        let mut depth = 0usize;
        let mut pending = Modifiers::empty();
        let mut prev_kind: Option<TokenKind> = None;

        while let Some(token) = self.tokens.get(self.pos).copied() {
            let this_kind = token.kind;
            match token.kind {
                TokenKind::Ident => {
                    let after_dot = prev_kind == Some(TokenKind::Dot);
                    match token.text {
                        "public" => {
                            pending |= Modifiers::PUBLIC;
                            self.pos += 1;
                        }
                        "protected" => {
                            pending |= Modifiers::PROTECTED;
                            self.pos += 1;
                        }
                        "private" => {
                            pending |= Modifiers::PRIVATE;
                            self.pos += 1;
                        }
                        "static" => {
                            pending |= Modifiers::STATIC;
                            self.pos += 1;
                        }
                        "abstract" => {
                            pending |= Modifiers::ABSTRACT;
                            self.pos += 1;
                        }
                        "final" => {
                            pending |= Modifiers::FINAL;
                            self.pos += 1;
                        }
                        // Contextual modifiers with no flag bit of their own;
                        // they must not clear what came before them.
                        "sealed" | "non" | "strictfp" => self.pos += 1,
                        "package" if depth == 0 && open.is_empty() && self.package.is_none() => {
                            self.pos += 1;
                            self.package = self.scan_dotted_name();
                            pending = Modifiers::empty();
                        }
                        "class" | "interface" | "enum" | "record" if !after_dot => {
                            let kind = match token.text {
                                "class" => TypeDeclKind::Class,
                                "interface" => TypeDeclKind::Interface,
                                "enum" => TypeDeclKind::Enum,
                                _ => TypeDeclKind::Record,
                            };
                            self.pos += 1;
                            if let Some((decl, has_body)) = self.scan_decl_header(kind, pending) {
                                if has_body {
                                    depth += 1;
                                    open.push((depth, decl));
                                } else {
                                    attach(decl, &mut open, &mut top);
                                }
                            }
                            pending = Modifiers::empty();
                        }
                        _ => {
                            pending = Modifiers::empty();
                            self.pos += 1;
                        }
                    }
                }
                TokenKind::At => {
                    let declares_annotation = self
                        .tokens
                        .get(self.pos + 1)
                        .is_some_and(|t| t.kind == TokenKind::Ident && t.text == "interface");
                    if declares_annotation {
                        self.pos += 2;
                        if let Some((decl, has_body)) =
                            self.scan_decl_header(TypeDeclKind::Annotation, pending)
                        {
                            if has_body {
                                depth += 1;
                                open.push((depth, decl));
                            } else {
                                attach(decl, &mut open, &mut top);
                            }
                        }
                        pending = Modifiers::empty();
                    } else {
                        // Annotation use: skip it without touching pending
                        // modifiers (`@Deprecated public class ...`).
                        self.pos += 1;
                        self.skip_annotation_use();
                    }
                }
                TokenKind::LBrace => {
                    depth += 1;
                    self.pos += 1;
                    pending = Modifiers::empty();
                }
                TokenKind::RBrace => {
                    if open.last().is_some_and(|(body_depth, _)| *body_depth == depth) {
                        if let Some((_, decl)) = open.pop() {
                            attach(decl, &mut open, &mut top);
                        }
                    }
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                    pending = Modifiers::empty();
                }
                _ => {
                    pending = Modifiers::empty();
                    self.pos += 1;
                }
            }
            prev_kind = Some(this_kind);
        }

        // Unbalanced input: close whatever is still open, innermost first.
        while let Some((_, decl)) = open.pop() {
            attach(decl, &mut open, &mut top);
        }

        UnitDecls {
            package: self.package,
            types: top,
        }
    }

    /// Called with the cursor just past the declaration keyword. Consumes the
    /// header up to and including the opening brace (or terminating
    /// semicolon) and reports whether a body follows.
    fn scan_decl_header(
        &mut self,
        kind: TypeDeclKind,
        pending: Modifiers,
    ) -> Option<(TypeDecl, bool)> {
        let name = match self.tokens.get(self.pos) {
            Some(t) if t.kind == TokenKind::Ident => Name::from(t.text),
            _ => return None,
        };
        self.pos += 1;

        let implicit = match kind {
            TypeDeclKind::Class => Modifiers::empty(),
            TypeDeclKind::Interface => Modifiers::INTERFACE | Modifiers::ABSTRACT,
            TypeDeclKind::Enum => Modifiers::ENUM,
            TypeDeclKind::Record => Modifiers::FINAL,
            TypeDeclKind::Annotation => {
                Modifiers::ANNOTATION | Modifiers::INTERFACE | Modifiers::ABSTRACT
            }
        };

        let mut decl = TypeDecl {
            kind,
            name,
            modifiers: pending | implicit,
            super_class: None,
            interfaces: Vec::new(),
            nested: Vec::new(),
        };

        loop {
            let Some(token) = self.tokens.get(self.pos).copied() else {
                return Some((decl, false));
            };
            match token.kind {
                TokenKind::Lt => self.skip_angle_brackets(),
                TokenKind::LParen => self.skip_parens(),
                TokenKind::At => {
                    self.pos += 1;
                    self.skip_annotation_use();
                }
                TokenKind::LBrace => {
                    self.pos += 1;
                    return Some((decl, true));
                }
                TokenKind::Semi => {
                    self.pos += 1;
                    return Some((decl, false));
                }
                // Malformed header; leave the brace for the outer scan.
                TokenKind::RBrace => return Some((decl, false)),
                TokenKind::Ident => match token.text {
                    "extends" => {
                        self.pos += 1;
                        let mut refs = self.scan_type_ref_list().into_iter();
                        if decl.super_class.is_none() {
                            decl.super_class = refs.next();
                        }
                        decl.interfaces.extend(refs);
                    }
                    "implements" => {
                        self.pos += 1;
                        let refs = self.scan_type_ref_list();
                        decl.interfaces.extend(refs);
                    }
                    "permits" => {
                        self.pos += 1;
                        let _ = self.scan_type_ref_list();
                    }
                    _ => self.pos += 1,
                },
                _ => self.pos += 1,
            }
        }
    }

    fn scan_dotted_name(&mut self) -> Option<Name> {
        let first = match self.tokens.get(self.pos) {
            Some(t) if t.kind == TokenKind::Ident => t.text,
            _ => return None,
        };
        self.pos += 1;

        let mut name = String::from(first);
        while self.peek_is(TokenKind::Dot) {
            match self.tokens.get(self.pos + 1) {
                Some(t) if t.kind == TokenKind::Ident => {
                    name.push('.');
                    name.push_str(t.text);
                    self.pos += 2;
                }
                _ => break,
            }
        }
        Some(Name::from(name))
    }

    fn scan_type_ref(&mut self) -> Option<Name> {
        let name = self.scan_dotted_name()?;
        if self.peek_is(TokenKind::Lt) {
            self.skip_angle_brackets();
        }
        Some(name)
    }

    fn scan_type_ref_list(&mut self) -> Vec<Name> {
        let mut refs = Vec::new();
        loop {
            while self.peek_is(TokenKind::At) {
                self.pos += 1;
                self.skip_annotation_use();
            }
            match self.scan_type_ref() {
                Some(name) => refs.push(name),
                None => break,
            }
            if self.peek_is(TokenKind::Comma) {
                self.pos += 1;
            } else {
                break;
            }
        }
        refs
    }

    /// Cursor at `<`; consumes the balanced run. Bails at braces or `;` so a
    /// broken header cannot swallow the rest of the unit.
    fn skip_angle_brackets(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semi => return,
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
            if depth == 0 {
                return;
            }
        }
    }

    /// Cursor at `(`; consumes the balanced run (annotation arguments may
    /// contain brace initializers, which pass through).
    fn skip_parens(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::Semi => return,
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
            if depth == 0 {
                return;
            }
        }
    }

    /// Cursor just past `@`: skip the dotted annotation name and optional
    /// argument list.
    fn skip_annotation_use(&mut self) {
        let _ = self.scan_dotted_name();
        if self.peek_is(TokenKind::LParen) {
            self.skip_parens();
        }
    }
}

fn attach(decl: TypeDecl, open: &mut Vec<(usize, TypeDecl)>, top: &mut Vec<TypeDecl>) {
    match open.last_mut() {
        Some((_, parent)) => parent.nested.push(decl),
        None => top.push(decl),
    }
}
