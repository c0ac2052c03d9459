//! Core IMAP types.
//!
//! Only the vocabulary needed to search, fetch header fields and move
//! messages is modeled here.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod uid_set;

pub use capability::{Capability, Status};
pub use flags::Flag;
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use response_code::ResponseCode;
pub use uid_set::UidSet;
