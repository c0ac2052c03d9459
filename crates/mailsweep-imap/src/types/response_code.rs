//! Response codes carried in `[...]` after a status keyword.

use super::{Capability, Uid, UidValidity};

/// Response code attached to a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: text must be shown to the user.
    Alert,
    /// CAPABILITY list sent in a greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// READ-ONLY: mailbox was opened read-only.
    ReadOnly,
    /// READ-WRITE: mailbox was opened read-write.
    ReadWrite,
    /// TRYCREATE: target mailbox does not exist.
    TryCreate,
    /// UIDNEXT value.
    UidNext(Uid),
    /// UIDVALIDITY value.
    UidValidity(UidValidity),
    /// AUTHENTICATIONFAILED (RFC 5530).
    AuthenticationFailed,
    /// Any other code, by name.
    Other(String),
}
