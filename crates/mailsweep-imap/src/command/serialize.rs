//! Command serialization helpers.

use crate::types::{Flag, Mailbox};

use super::types::{FetchAttribute, SearchCriteria, StoreAction};

/// IMAP date format for SEARCH keys (`01-Jan-2024`).
const SEARCH_DATE_FORMAT: &str = "%d-%b-%Y";

/// Writes an astring (atom or quoted string).
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Writes a mailbox name.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) {
    write_astring(buf, mailbox.as_str());
}

const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}

/// Writes a parenthesized FETCH item list.
pub fn write_fetch_items(buf: &mut Vec<u8>, items: &[FetchAttribute]) {
    buf.push(b'(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        match item {
            FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
            FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
            FetchAttribute::HeaderFields(names) => {
                buf.extend_from_slice(b"BODY.PEEK[HEADER.FIELDS (");
                for (j, name) in names.iter().enumerate() {
                    if j > 0 {
                        buf.push(b' ');
                    }
                    buf.extend_from_slice(name.to_ascii_uppercase().as_bytes());
                }
                buf.extend_from_slice(b")]");
            }
        }
    }
    buf.push(b')');
}

/// Writes a STORE action.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction, silent: bool) {
    let (prefix, flags) = match action {
        StoreAction::AddFlags(flags) => ("+FLAGS", flags),
        StoreAction::RemoveFlags(flags) => ("-FLAGS", flags),
    };
    buf.extend_from_slice(prefix.as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.push(b' ');
    write_flag_list(buf, flags);
}

fn write_flag_list(buf: &mut Vec<u8>, flags: &[Flag]) {
    buf.push(b'(');
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Returns true if any string in the tree is outside US-ASCII, in which
/// case the SEARCH must declare `CHARSET UTF-8`.
pub fn search_needs_utf8(criteria: &SearchCriteria) -> bool {
    match criteria {
        SearchCriteria::Subject(s) | SearchCriteria::From(s) => !s.is_ascii(),
        SearchCriteria::Header(name, value) => !name.is_ascii() || !value.is_ascii(),
        SearchCriteria::And(keys) => keys.iter().any(search_needs_utf8),
        SearchCriteria::Or(a, b) => search_needs_utf8(a) || search_needs_utf8(b),
        SearchCriteria::Not(inner) => search_needs_utf8(inner),
        SearchCriteria::All
        | SearchCriteria::Flagged
        | SearchCriteria::Deleted
        | SearchCriteria::Before(_)
        | SearchCriteria::Since(_)
        | SearchCriteria::Uid(_) => false,
    }
}

/// Writes SEARCH criteria at the top level, where a conjunction needs no
/// parentheses.
pub fn write_search_criteria(buf: &mut Vec<u8>, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::And(keys) if keys.is_empty() => buf.extend_from_slice(b"ALL"),
        SearchCriteria::And(keys) => {
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_search_operand(buf, key);
            }
        }
        other => write_search_operand(buf, other),
    }
}

/// Writes one search key; a conjunction in operand position is grouped.
fn write_search_operand(buf: &mut Vec<u8>, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::Flagged => buf.extend_from_slice(b"FLAGGED"),
        SearchCriteria::Deleted => buf.extend_from_slice(b"DELETED"),
        SearchCriteria::Subject(s) => {
            buf.extend_from_slice(b"SUBJECT ");
            write_astring(buf, s);
        }
        SearchCriteria::From(s) => {
            buf.extend_from_slice(b"FROM ");
            write_astring(buf, s);
        }
        SearchCriteria::Header(name, value) => {
            buf.extend_from_slice(b"HEADER ");
            write_astring(buf, name);
            buf.push(b' ');
            write_astring(buf, value);
        }
        SearchCriteria::Before(date) => {
            buf.extend_from_slice(b"BEFORE ");
            buf.extend_from_slice(date.format(SEARCH_DATE_FORMAT).to_string().as_bytes());
        }
        SearchCriteria::Since(date) => {
            buf.extend_from_slice(b"SINCE ");
            buf.extend_from_slice(date.format(SEARCH_DATE_FORMAT).to_string().as_bytes());
        }
        SearchCriteria::Uid(set) => {
            buf.extend_from_slice(b"UID ");
            buf.extend_from_slice(set.to_string().as_bytes());
        }
        SearchCriteria::And(keys) if keys.len() == 1 => write_search_operand(buf, &keys[0]),
        SearchCriteria::And(_) => {
            buf.push(b'(');
            write_search_criteria(buf, criteria);
            buf.push(b')');
        }
        SearchCriteria::Or(a, b) => {
            buf.extend_from_slice(b"OR ");
            write_search_operand(buf, a);
            buf.push(b' ');
            write_search_operand(buf, b);
        }
        SearchCriteria::Not(inner) => {
            buf.extend_from_slice(b"NOT ");
            write_search_operand(buf, inner);
        }
    }
}
