//! Mailbox names, LIST data and SELECT status.

use super::{Flag, Uid, UidValidity};

/// Mailbox name as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(String);

impl Mailbox {
    /// Creates a mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares two names the way servers do: INBOX is case-insensitive,
    /// every other name is compared exactly.
    #[must_use]
    pub fn same_as(&self, other: &str) -> bool {
        if self.0.eq_ignore_ascii_case("INBOX") {
            other.eq_ignore_ascii_case("INBOX")
        } else {
            self.0 == other
        }
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status snapshot from SELECT/EXAMINE.
#[derive(Debug, Clone, Default)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined for this mailbox.
    pub flags: Vec<Flag>,
    /// Whether the server opened the mailbox read-only.
    pub read_only: bool,
}

/// One LIST response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Mailbox name.
    pub mailbox: Mailbox,
}

/// Mailbox attribute from a LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// `\Noselect`
    NoSelect,
    /// `\NonExistent`
    NonExistent,
    /// `\HasChildren`
    HasChildren,
    /// `\HasNoChildren`
    HasNoChildren,
    /// Any other attribute, including SPECIAL-USE markers.
    Other(String),
}

impl MailboxAttribute {
    /// Parses an attribute atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\NONEXISTENT" => Self::NonExistent,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl ListResponse {
    /// Returns true if the mailbox can be selected.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self
            .attributes
            .iter()
            .any(|a| matches!(a, MailboxAttribute::NoSelect | MailboxAttribute::NonExistent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_matches_any_case() {
        assert!(Mailbox::new("INBOX").same_as("inbox"));
        assert!(Mailbox::new("Inbox").same_as("INBOX"));
    }

    #[test]
    fn other_names_match_exactly() {
        assert!(Mailbox::new("Review/Delete").same_as("Review/Delete"));
        assert!(!Mailbox::new("Review/Delete").same_as("review/delete"));
    }

    #[test]
    fn noselect_is_not_selectable() {
        let entry = ListResponse {
            attributes: vec![MailboxAttribute::parse("\\Noselect")],
            delimiter: Some('/'),
            mailbox: Mailbox::new("Review"),
        };
        assert!(!entry.is_selectable());
    }
}
