//! IMAP connection management.
//!
//! - [`SessionConfig`] and [`Security`]: where and how to connect
//! - [`ImapStream`]: plain or TLS transport
//! - [`FramedStream`]: line and literal framing
//! - [`Client`]: type-state wrapper around one connection
//! - [`Session`]: timeouts and reconnection on top of `Client`

mod client;
mod config;
mod framed;
mod session;
mod stream;

pub use client::{Authenticated, Client, MailboxAccess, NotAuthenticated, SelectError, Selected};
pub use config::{Security, SessionConfig};
pub use framed::{Completion, FramedStream};
pub use session::Session;
pub use stream::{ImapStream, connect, create_tls_connector};
