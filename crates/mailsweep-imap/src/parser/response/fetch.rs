//! FETCH response parsing.

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{Flag, Uid};

use super::helpers::{parse_flag_list, skip_to_close_paren};

/// One data item of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// UID.
    Uid(Uid),
    /// Current flags.
    Flags(Vec<Flag>),
    /// `BODY[section]` data; `None` when the server sent NIL.
    Body {
        /// Section specifier, e.g. `HEADER.FIELDS (FROM SUBJECT)`.
        section: Option<String>,
        /// Raw bytes.
        data: Option<Vec<u8>>,
    },
}

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen | Token::Eof => break,
            Token::Space => {}
            Token::Atom(name) => match name.to_ascii_uppercase().as_str() {
                "UID" => {
                    lexer.expect_space()?;
                    let n = lexer.read_number()?;
                    let uid = Uid::new(n).ok_or_else(|| lexer.error("UID 0 in FETCH"))?;
                    items.push(FetchItem::Uid(uid));
                }
                "FLAGS" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::Flags(parse_flag_list(lexer)?));
                }
                "BODY" if lexer.peek() == Some(b'[') => items.push(parse_body(lexer)?),
                "RFC822.HEADER" => items.push(parse_body(lexer)?),
                _ => skip_fetch_value(lexer),
            },
            _ => {}
        }
    }

    Ok(items)
}

/// Parses `[section]<origin> SP nstring`; the name is already consumed.
fn parse_body(lexer: &mut Lexer<'_>) -> Result<FetchItem> {
    let section = parse_section(lexer);
    lexer.expect_space()?;
    let data = match lexer.next_token()? {
        Token::Literal(bytes) => Some(bytes),
        Token::QuotedString(s) => Some(s.into_bytes()),
        _ => None,
    };
    Ok(FetchItem::Body { section, data })
}

/// Reads an optional `[section]` and `<origin>` after BODY.
fn parse_section(lexer: &mut Lexer<'_>) -> Option<String> {
    let mut section = None;

    if lexer.peek() == Some(b'[') {
        lexer.advance();
        let mut buf = Vec::new();
        while let Some(b) = lexer.advance() {
            if b == b']' {
                break;
            }
            buf.push(b);
        }
        if !buf.is_empty() {
            section = Some(String::from_utf8_lossy(&buf).into_owned());
        }
    }

    if lexer.peek() == Some(b'<') {
        while let Some(b) = lexer.advance() {
            if b == b'>' {
                break;
            }
        }
    }

    section
}

/// Skips the value of an item we did not ask for.
fn skip_fetch_value(lexer: &mut Lexer<'_>) {
    // `BODY[...]`-style names carry their section before the space.
    if lexer.peek() == Some(b'[') {
        let _ = parse_section(lexer);
    }
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }

    match lexer.peek() {
        Some(b'(') => {
            lexer.advance();
            skip_to_close_paren(lexer);
        }
        Some(b'"' | b'{') => {
            let _ = lexer.next_token();
        }
        _ => {
            while lexer
                .peek()
                .is_some_and(|b| !matches!(b, b' ' | b')' | b'\r'))
            {
                lexer.advance();
            }
        }
    }
}
