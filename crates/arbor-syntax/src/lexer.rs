//! Minimal Java lexer: identifiers plus the punctuation the scanner cares
//! about, with comments, whitespace, and string/char literals dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Lt,
    Gt,
    Comma,
    Dot,
    Semi,
    At,
    Other,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub(crate) fn lex(text: &str) -> Vec<Token<'_>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    let byte_at = |i: usize| chars.get(i).map_or(text.len(), |(pos, _)| *pos);

    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if matches!(chars.get(i + 1), Some((_, '/'))) => {
                while i < chars.len() && chars[i].1 != '\n' {
                    i += 1;
                }
            }
            '/' if matches!(chars.get(i + 1), Some((_, '*'))) => {
                i += 2;
                while i < chars.len() {
                    if chars[i].1 == '*' && matches!(chars.get(i + 1), Some((_, '/'))) {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            '"' => {
                if matches!(chars.get(i + 1), Some((_, '"')))
                    && matches!(chars.get(i + 2), Some((_, '"')))
                {
                    // Text block: scan to the closing triple quote.
                    i += 3;
                    while i < chars.len() {
                        if chars[i].1 == '"'
                            && matches!(chars.get(i + 1), Some((_, '"')))
                            && matches!(chars.get(i + 2), Some((_, '"')))
                        {
                            i += 3;
                            break;
                        }
                        i += 1;
                    }
                } else {
                    i += 1;
                    while i < chars.len() {
                        match chars[i].1 {
                            '\\' => i += 2,
                            '"' | '\n' => {
                                i += 1;
                                break;
                            }
                            _ => i += 1,
                        }
                    }
                }
            }
            '\'' => {
                i += 1;
                while i < chars.len() {
                    match chars[i].1 {
                        '\\' => i += 2,
                        '\'' | '\n' => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
            }
            c if is_ident_start(c) => {
                let start = pos;
                while i < chars.len() && is_ident_continue(chars[i].1) {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident,
                    text: &text[start..byte_at(i)],
                });
            }
            _ => {
                let kind = match c {
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '<' => TokenKind::Lt,
                    '>' => TokenKind::Gt,
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    ';' => TokenKind::Semi,
                    '@' => TokenKind::At,
                    _ => TokenKind::Other,
                };
                tokens.push(Token {
                    kind,
                    text: &text[pos..pos + c.len_utf8()],
                });
                i += 1;
            }
        }
    }

    tokens
}
