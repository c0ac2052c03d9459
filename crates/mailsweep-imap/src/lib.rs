//! # mailsweep-imap
//!
//! A small async IMAP4rev1 client covering what a mailbox cleanup needs:
//! login, LIST/CREATE, SELECT/EXAMINE, UID SEARCH, header-only UID FETCH,
//! and moving messages with UID MOVE or the COPY/STORE/EXPUNGE fallback.
//!
//! ## Connection States
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select()/examine() ───→ Selected
//! └─────────────────────┘
//! ```
//!
//! A refused SELECT hands the client back as `Authenticated`.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsweep_imap::{SearchCriteria, Session, SessionConfig};
//!
//! let config = SessionConfig::new("imap.example.com", 993)
//!     .credentials("user@example.com", "app-password");
//! let mut session = Session::connect(config).await?;
//! session.examine("INBOX").await?;
//! let flagged = session.uid_search(&SearchCriteria::Flagged).await?;
//! session.logout().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SearchCriteria, StoreAction, TagGenerator};
pub use connection::{
    Authenticated, Client, Completion, FramedStream, ImapStream, MailboxAccess, NotAuthenticated,
    SelectError, Security, Selected, Session, SessionConfig,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, ResponseCode,
    SeqNum, Status, Tag, Uid, UidSet, UidValidity,
};
