//! Session wrapper with timeouts and automatic reconnection.
//!
//! `Session` hides the type-state transitions of [`Client`] behind a
//! `&mut self` API. Every command runs under the configured command
//! timeout; connect, greeting and login together run under the connect
//! timeout. A fatal error (I/O, timeout, BYE) drops the connection, and
//! the next call reconnects and reopens the last mailbox in the same mode
//! when auto-reconnect is enabled.
//!
//! ```ignore
//! use mailsweep_imap::{Session, SessionConfig};
//!
//! let config = SessionConfig::new("imap.example.com", 993)
//!     .credentials("user@example.com", "app-password");
//! let mut session = Session::connect(config).await?;
//!
//! session.examine("INBOX").await?;
//! let uids = session.uid_search(&SearchCriteria::All).await?;
//! session.logout().await?;
//! ```

use std::future::Future;
use std::time::Duration;

use super::client::{Authenticated, Client, MailboxAccess, SelectError, Selected};
use super::config::SessionConfig;
use super::stream::{ImapStream, connect};
use crate::command::{FetchAttribute, SearchCriteria, StoreAction};
use crate::parser::FetchItem;
use crate::types::{Capability, ListResponse, MailboxStatus, Uid, UidSet};
use crate::{Error, Result};

enum SessionState {
    Disconnected,
    Authenticated(Client<ImapStream, Authenticated>),
    Selected(Client<ImapStream, Selected>),
}

/// A logged-in IMAP connection.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    /// Mailbox to reopen after a reconnect, and whether it was read-only.
    last_mailbox: Option<(String, bool)>,
}

impl Session {
    /// Connects, reads the greeting and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the whole sequence exceeds the connect
    /// timeout, [`Error::Auth`] on rejected credentials, and I/O or TLS
    /// errors otherwise.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let client = establish(&config).await?;
        Ok(Self {
            config,
            state: SessionState::Authenticated(client),
            last_mailbox: None,
        })
    }

    /// The settings this session was opened with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// True while the underlying connection is believed alive.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        !matches!(self.state, SessionState::Disconnected)
    }

    /// The currently open mailbox, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        match &self.state {
            SessionState::Selected(client) => Some(client.mailbox()),
            _ => None,
        }
    }

    /// Capabilities of the live connection; empty while disconnected.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        match &self.state {
            SessionState::Authenticated(client) => client.capabilities(),
            SessionState::Selected(client) => client.capabilities(),
            SessionState::Disconnected => &[],
        }
    }

    /// True if the server offers UID MOVE.
    #[must_use]
    pub fn supports_move(&self) -> bool {
        self.capabilities().contains(&Capability::Move)
    }

    /// True if the server offers UID EXPUNGE.
    #[must_use]
    pub fn supports_uidplus(&self) -> bool {
        self.capabilities().contains(&Capability::UidPlus)
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Fails when the connection is gone or the command fails.
    pub async fn noop(&mut self) -> Result<()> {
        self.ensure_connected().await?;
        let limit = self.config.command_timeout;
        let result = match &mut self.state {
            SessionState::Authenticated(client) => bounded(limit, client.noop()).await,
            SessionState::Selected(client) => bounded(limit, client.noop()).await,
            SessionState::Disconnected => Err(not_connected()),
        };
        self.settle(result)
    }

    /// Lists mailboxes matching `pattern`.
    ///
    /// # Errors
    ///
    /// Fails when the connection is gone or the command fails.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.ensure_connected().await?;
        let limit = self.config.command_timeout;
        let result = match &mut self.state {
            SessionState::Authenticated(client) => {
                bounded(limit, client.list(reference, pattern)).await
            }
            SessionState::Selected(client) => bounded(limit, client.list(reference, pattern)).await,
            SessionState::Disconnected => Err(not_connected()),
        };
        self.settle(result)
    }

    /// Creates a mailbox.
    ///
    /// # Errors
    ///
    /// Fails when the connection is gone or the server refuses.
    pub async fn create(&mut self, mailbox: &str) -> Result<()> {
        self.ensure_connected().await?;
        let limit = self.config.command_timeout;
        let result = match &mut self.state {
            SessionState::Authenticated(client) => bounded(limit, client.create(mailbox)).await,
            SessionState::Selected(client) => bounded(limit, client.create(mailbox)).await,
            SessionState::Disconnected => Err(not_connected()),
        };
        self.settle(result)
    }

    /// Opens `mailbox` read-write.
    ///
    /// # Errors
    ///
    /// Fails when the connection is gone or the server refuses. After a
    /// refusal the session stays usable with no mailbox open.
    pub async fn select(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.ensure_connected().await?;
        self.open(mailbox, false).await
    }

    /// Opens `mailbox` read-only.
    ///
    /// # Errors
    ///
    /// Same as [`Session::select`].
    pub async fn examine(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.ensure_connected().await?;
        self.open(mailbox, true).await
    }

    /// UID SEARCH in the open mailbox.
    ///
    /// # Errors
    ///
    /// Fails when no mailbox is open, the connection is gone, or the
    /// command fails.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>> {
        let limit = self.config.command_timeout;
        let client = self.selected_client().await?;
        let result = bounded(limit, client.uid_search(criteria)).await;
        self.settle(result)
    }

    /// UID FETCH in the open mailbox.
    ///
    /// # Errors
    ///
    /// Same as [`Session::uid_search`].
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        items: &[FetchAttribute],
    ) -> Result<Vec<Vec<FetchItem>>> {
        let limit = self.config.command_timeout;
        let client = self.selected_client().await?;
        let result = bounded(limit, client.uid_fetch(uids, items)).await;
        self.settle(result)
    }

    /// Silent UID STORE in the open mailbox.
    ///
    /// # Errors
    ///
    /// Same as [`Session::uid_search`].
    pub async fn uid_store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        let limit = self.config.command_timeout;
        let client = self.selected_client().await?;
        let result = bounded(limit, client.uid_store(uids, action)).await;
        self.settle(result)
    }

    /// UID COPY from the open mailbox.
    ///
    /// # Errors
    ///
    /// Same as [`Session::uid_search`].
    pub async fn uid_copy(&mut self, uids: &UidSet, target: &str) -> Result<()> {
        let limit = self.config.command_timeout;
        let client = self.selected_client().await?;
        let result = bounded(limit, client.uid_copy(uids, target)).await;
        self.settle(result)
    }

    /// UID MOVE from the open mailbox.
    ///
    /// # Errors
    ///
    /// Same as [`Session::uid_search`], plus [`Error::InvalidState`] when
    /// the server lacks MOVE.
    pub async fn uid_move(&mut self, uids: &UidSet, target: &str) -> Result<()> {
        let limit = self.config.command_timeout;
        let client = self.selected_client().await?;
        let result = bounded(limit, client.uid_move(uids, target)).await;
        self.settle(result)
    }

    /// EXPUNGE in the open mailbox; returns the number removed.
    ///
    /// # Errors
    ///
    /// Same as [`Session::uid_search`].
    pub async fn expunge(&mut self) -> Result<usize> {
        let limit = self.config.command_timeout;
        let client = self.selected_client().await?;
        let result = bounded(limit, client.expunge()).await;
        self.settle(result)
    }

    /// UID EXPUNGE in the open mailbox; returns the number removed.
    ///
    /// # Errors
    ///
    /// Same as [`Session::uid_search`].
    pub async fn uid_expunge(&mut self, uids: &UidSet) -> Result<usize> {
        let limit = self.config.command_timeout;
        let client = self.selected_client().await?;
        let result = bounded(limit, client.uid_expunge(uids)).await;
        self.settle(result)
    }

    /// Logs out. The session is disconnected afterwards whatever happens.
    ///
    /// # Errors
    ///
    /// Fails if LOGOUT could not be sent in time.
    pub async fn logout(&mut self) -> Result<()> {
        let limit = self.config.command_timeout;
        self.last_mailbox = None;
        match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Authenticated(client) => bounded(limit, client.logout()).await,
            SessionState::Selected(client) => bounded(limit, client.logout()).await,
            SessionState::Disconnected => Ok(()),
        }
    }

    /// Drops the current connection, connects again and reopens the last
    /// mailbox.
    ///
    /// # Errors
    ///
    /// Fails when every attempt fails, immediately on rejected credentials,
    /// and when the last mailbox can no longer be opened.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.state = SessionState::Disconnected;
        let max_attempts = self.config.max_reconnect_attempts.max(1);

        for attempt in 1..=max_attempts {
            tracing::info!(host = %self.config.host, attempt, "reconnecting");
            match establish(&self.config).await {
                Ok(client) => {
                    self.state = SessionState::Authenticated(client);
                    break;
                }
                Err(e @ Error::Auth(_)) => return Err(e),
                Err(e) if attempt == max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "reconnect attempt failed");
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt) * 2)).await;
                }
            }
        }

        if let Some((mailbox, read_only)) = self.last_mailbox.clone() {
            self.open(&mailbox, read_only).await?;
        }
        Ok(())
    }

    async fn open(&mut self, mailbox: &str, read_only: bool) -> Result<MailboxStatus> {
        let limit = self.config.command_timeout;
        let (state, result) = match std::mem::replace(&mut self.state, SessionState::Disconnected)
        {
            SessionState::Authenticated(client) => {
                open_from(client, mailbox, read_only, limit).await
            }
            SessionState::Selected(client) => open_from(client, mailbox, read_only, limit).await,
            SessionState::Disconnected => (SessionState::Disconnected, Err(not_connected())),
        };
        self.state = state;

        match &result {
            Ok(_) => self.last_mailbox = Some((mailbox.to_string(), read_only)),
            Err(e) => {
                tracing::debug!(mailbox, read_only, error = %e, "could not open mailbox");
                self.last_mailbox = None;
            }
        }
        result
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        match self.state {
            SessionState::Authenticated(_) | SessionState::Selected(_) => Ok(()),
            SessionState::Disconnected if self.config.auto_reconnect => self.reconnect().await,
            SessionState::Disconnected => Err(not_connected()),
        }
    }

    async fn selected_client(&mut self) -> Result<&mut Client<ImapStream, Selected>> {
        if matches!(self.state, SessionState::Disconnected) {
            self.ensure_connected().await?;
        }
        match &mut self.state {
            SessionState::Selected(client) => Ok(client),
            _ => Err(Error::InvalidState("no mailbox selected".to_string())),
        }
    }

    /// Marks the session disconnected after a fatal error.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && e.is_fatal()
        {
            tracing::warn!(host = %self.config.host, error = %e, "dropping IMAP connection");
            self.state = SessionState::Disconnected;
        }
        result
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("usable", &self.is_usable())
            .field("selected_mailbox", &self.selected_mailbox())
            .finish_non_exhaustive()
    }
}

async fn establish(config: &SessionConfig) -> Result<Client<ImapStream, Authenticated>> {
    let limit = config.connect_timeout;
    let login = async {
        let stream = connect(&config.host, config.port, config.security).await?;
        let client = Client::from_stream(stream).await?;
        client.login(&config.username, &config.password).await
    };
    let client = bounded(limit, login).await?;
    tracing::debug!(host = %config.host, port = config.port, "logged in");
    Ok(client)
}

async fn open_from<State: MailboxAccess>(
    client: Client<ImapStream, State>,
    mailbox: &str,
    read_only: bool,
    limit: Duration,
) -> (SessionState, Result<MailboxStatus>) {
    match tokio::time::timeout(limit, client.open(mailbox, read_only)).await {
        Ok(Ok((selected, status))) => (SessionState::Selected(selected), Ok(status)),
        Ok(Err(SelectError {
            error,
            client: Some(client),
        })) => (SessionState::Authenticated(client), Err(error)),
        Ok(Err(SelectError {
            error,
            client: None,
        })) => (SessionState::Disconnected, Err(error)),
        Err(_) => (SessionState::Disconnected, Err(Error::Timeout(limit))),
    }
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(limit))?
}

fn not_connected() -> Error {
    Error::ConnectionLost("session is disconnected".to_string())
}
