//! # mailsweep-core
//!
//! The scan, classify and relocate pipeline behind `mailsweep`.
//!
//! This crate provides:
//! - [`Config`]: layered JSON configuration with defaults and validation
//! - [`SessionPool`]: a bounded cache of authenticated IMAP sessions
//! - [`protocol`]: search, header fetch and move operations that degrade
//!   instead of failing
//! - [`classify`]: the pure per-message decision
//! - [`Orchestrator`]: the per-folder search, fetch, decide and move phases
//!
//! The network is reached only through the [`MailSession`] and
//! [`Connector`] traits, so the whole pipeline runs against an in-memory
//! mailbox in tests.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
mod error;
pub mod orchestrator;
pub mod pool;
pub mod progress;
pub mod protocol;
pub mod query;
pub mod session;

pub use classify::{Decision, MatchReason, MatchSets, Rules, SkipReason, Verdict, classify};
pub use config::{Config, ValidationError, ValidationResult, WorkerCount};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, RunSettings, Totals, partition};
pub use pool::{PooledSession, SessionPool};
pub use progress::{EmailAction, NoopReporter, Phase, ProgressReporter, RunStats};
pub use protocol::HeaderRecord;
pub use query::FolderQueries;
pub use session::{Connector, ImapConnector, MailSession};

pub use mailsweep_imap::Uid;
