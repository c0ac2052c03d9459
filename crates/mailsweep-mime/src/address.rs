//! Sender address extraction from a `From:` value.

/// The mailbox part of a `From:` header, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    /// `local@domain`; empty when the header names no address.
    pub address: String,
    /// Text after the last `@`; empty when there is none.
    pub domain: String,
}

impl Address {
    /// Extracts the first address from a header value.
    ///
    /// Handles `Name <addr>`, bare `addr`, `addr (comment)` and lists
    /// (only the first entry counts). A value without an `@` has no
    /// address at all.
    #[must_use]
    pub fn parse(from: &str) -> Self {
        let found = extract(from);
        if !found.contains('@') {
            return Self::default();
        }
        let address = found.to_lowercase();
        let domain = address
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_default();
        Self { address, domain }
    }
}

fn extract(from: &str) -> &str {
    let first = first_entry(from.trim());

    if let Some(open) = first.rfind('<') {
        let inner = &first[open + 1..];
        let inner = inner.find('>').map_or(inner, |close| &inner[..close]);
        return inner.trim();
    }

    let without_comment = first.find('(').map_or(first, |open| &first[..open]);
    without_comment
        .split_whitespace()
        .find(|token| token.contains('@'))
        .unwrap_or_else(|| without_comment.trim())
        .trim_matches('"')
}

/// The first comma-separated entry, ignoring commas inside quotes.
fn first_entry(list: &str) -> &str {
    let mut quoted = false;
    for (i, c) in list.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => return &list[..i],
            _ => {}
        }
    }
    list
}
