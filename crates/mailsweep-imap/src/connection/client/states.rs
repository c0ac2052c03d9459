//! Connection states for the type-state client.
//!
//! `Selected` carries the mailbox it refers to, so UIDs returned by a
//! selected client can always be tied back to their folder.

/// Connected, greeting read, not logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in, no mailbox selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is selected.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: String,
    pub(crate) read_only: bool,
}

impl Selected {
    /// Name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// True when opened with EXAMINE or when the server forced READ-ONLY.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Authenticated {}
    impl Sealed for super::Selected {}
}

/// States in which mailbox-level commands (LIST, CREATE, SELECT, EXAMINE)
/// are valid.
pub trait MailboxAccess: sealed::Sealed {}

impl MailboxAccess for Authenticated {}
impl MailboxAccess for Selected {}
