//! The session seam between the pipeline and the IMAP client.
//!
//! The pipeline talks to [`MailSession`] and opens sessions through a
//! [`Connector`]. [`ImapConnector`] is the production pair over
//! [`mailsweep_imap::Session`]; tests supply an in-memory mailbox.

use async_trait::async_trait;
use mailsweep_imap::{
    FetchAttribute, FetchItem, SearchCriteria, Session, SessionConfig, StoreAction, Uid, UidSet,
};

use crate::config::Config;

/// One authenticated mailbox connection, used by one task at a time.
///
/// All message-addressing calls use UIDs from the folder opened last.
#[async_trait]
pub trait MailSession: Send {
    /// True while the connection is believed alive.
    fn is_healthy(&self) -> bool;

    /// Server advertises MOVE.
    fn supports_move(&self) -> bool;

    /// Server advertises UIDPLUS.
    fn supports_uidplus(&self) -> bool;

    /// Names of all folders.
    async fn list_folders(&mut self) -> mailsweep_imap::Result<Vec<String>>;

    /// Creates a folder.
    async fn create_folder(&mut self, name: &str) -> mailsweep_imap::Result<()>;

    /// Opens a folder read-only.
    async fn examine(&mut self, folder: &str) -> mailsweep_imap::Result<()>;

    /// Opens a folder read-write.
    async fn select(&mut self, folder: &str) -> mailsweep_imap::Result<()>;

    /// UIDs matching `criteria` in the open folder.
    async fn uid_search(&mut self, criteria: &SearchCriteria) -> mailsweep_imap::Result<Vec<Uid>>;

    /// Raw `HEADER.FIELDS` block for one message, `None` when the server
    /// returned nothing for it.
    async fn fetch_header_block(
        &mut self,
        uid: Uid,
        fields: &[&str],
    ) -> mailsweep_imap::Result<Option<Vec<u8>>>;

    /// UID MOVE of one message.
    async fn uid_move(&mut self, uid: Uid, target: &str) -> mailsweep_imap::Result<()>;

    /// UID COPY of one message.
    async fn uid_copy(&mut self, uid: Uid, target: &str) -> mailsweep_imap::Result<()>;

    /// UID STORE of one message.
    async fn uid_store(&mut self, uid: Uid, action: StoreAction) -> mailsweep_imap::Result<()>;

    /// UID EXPUNGE of one message.
    async fn uid_expunge(&mut self, uid: Uid) -> mailsweep_imap::Result<()>;

    /// Plain EXPUNGE of the open folder.
    async fn expunge(&mut self) -> mailsweep_imap::Result<()>;

    /// Ends the session.
    async fn logout(&mut self) -> mailsweep_imap::Result<()>;
}

/// Opens new authenticated sessions.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Session type produced.
    type Session: MailSession + 'static;

    /// Connects and logs in.
    async fn connect(&self) -> mailsweep_imap::Result<Self::Session>;
}

/// Connects to the configured server with implicit TLS.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: SessionConfig,
}

impl ImapConnector {
    /// Builds a connector from the run configuration and credentials.
    ///
    /// The search timeout bounds both the connect sequence and every
    /// command.
    #[must_use]
    pub fn new(config: &Config, username: &str, password: &str) -> Self {
        let timeout = config.cleanup_settings.command_timeout();
        let session = SessionConfig::new(
            config.mail_settings.imap_host.clone(),
            config.mail_settings.imap_port,
        )
        .credentials(username, password)
        .connect_timeout(timeout)
        .command_timeout(timeout)
        .auto_reconnect(true);
        Self { config: session }
    }

    /// Uses prepared session settings as they are.
    #[must_use]
    pub const fn with_session_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Settings every new session is opened with.
    #[must_use]
    pub const fn session_config(&self) -> &SessionConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for ImapConnector {
    type Session = Session;

    async fn connect(&self) -> mailsweep_imap::Result<Session> {
        Session::connect(self.config.clone()).await
    }
}

#[async_trait]
impl MailSession for Session {
    fn is_healthy(&self) -> bool {
        self.is_usable()
    }

    fn supports_move(&self) -> bool {
        Self::supports_move(self)
    }

    fn supports_uidplus(&self) -> bool {
        Self::supports_uidplus(self)
    }

    async fn list_folders(&mut self) -> mailsweep_imap::Result<Vec<String>> {
        let entries = self.list("", "*").await?;
        Ok(entries
            .into_iter()
            .map(|entry| entry.mailbox.as_str().to_string())
            .collect())
    }

    async fn create_folder(&mut self, name: &str) -> mailsweep_imap::Result<()> {
        self.create(name).await
    }

    async fn examine(&mut self, folder: &str) -> mailsweep_imap::Result<()> {
        Self::examine(self, folder).await.map(drop)
    }

    async fn select(&mut self, folder: &str) -> mailsweep_imap::Result<()> {
        Self::select(self, folder).await.map(drop)
    }

    async fn uid_search(&mut self, criteria: &SearchCriteria) -> mailsweep_imap::Result<Vec<Uid>> {
        Self::uid_search(self, criteria).await
    }

    async fn fetch_header_block(
        &mut self,
        uid: Uid,
        fields: &[&str],
    ) -> mailsweep_imap::Result<Option<Vec<u8>>> {
        let attributes = [
            FetchAttribute::Uid,
            FetchAttribute::header_fields(fields.iter().copied()),
        ];
        let fetched = self.uid_fetch(&UidSet::single(uid), &attributes).await?;
        Ok(header_block_for(uid, fetched))
    }

    async fn uid_move(&mut self, uid: Uid, target: &str) -> mailsweep_imap::Result<()> {
        Self::uid_move(self, &UidSet::single(uid), target).await
    }

    async fn uid_copy(&mut self, uid: Uid, target: &str) -> mailsweep_imap::Result<()> {
        Self::uid_copy(self, &UidSet::single(uid), target).await
    }

    async fn uid_store(&mut self, uid: Uid, action: StoreAction) -> mailsweep_imap::Result<()> {
        Self::uid_store(self, &UidSet::single(uid), action).await
    }

    async fn uid_expunge(&mut self, uid: Uid) -> mailsweep_imap::Result<()> {
        Self::uid_expunge(self, &UidSet::single(uid)).await.map(drop)
    }

    async fn expunge(&mut self) -> mailsweep_imap::Result<()> {
        Self::expunge(self).await.map(drop)
    }

    async fn logout(&mut self) -> mailsweep_imap::Result<()> {
        Self::logout(self).await
    }
}

/// Picks the body section of the FETCH answer that carries `uid`.
///
/// Servers may interleave unsolicited FETCH data for other messages, so
/// the answer is matched on its `UID` item rather than taken first.
fn header_block_for(uid: Uid, fetched: Vec<Vec<FetchItem>>) -> Option<Vec<u8>> {
    fetched
        .into_iter()
        .find(|items| items.contains(&FetchItem::Uid(uid)))?
        .into_iter()
        .find_map(|item| match item {
            FetchItem::Body { data, .. } => data,
            _ => None,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    #[test]
    fn test_header_block_matches_uid() {
        let fetched = vec![
            vec![FetchItem::Uid(uid(3)), FetchItem::Flags(Vec::new())],
            vec![
                FetchItem::Uid(uid(9)),
                FetchItem::Body {
                    section: Some("HEADER.FIELDS (FROM SUBJECT)".into()),
                    data: Some(b"From: a@b.example\r\n\r\n".to_vec()),
                },
            ],
        ];
        let block = header_block_for(uid(9), fetched).unwrap();
        assert!(block.starts_with(b"From:"));
    }

    #[test]
    fn test_header_block_missing() {
        let fetched = vec![vec![
            FetchItem::Uid(uid(9)),
            FetchItem::Body {
                section: None,
                data: None,
            },
        ]];
        assert!(header_block_for(uid(9), fetched.clone()).is_none());
        assert!(header_block_for(uid(4), fetched).is_none());
    }

    #[test]
    fn test_connector_uses_search_timeout() {
        let mut config = Config::default();
        config.cleanup_settings.search_timeout = 12;
        let connector = ImapConnector::new(&config, "me@icloud.example", "secret");
        let session = connector.session_config();
        assert_eq!(session.host, "imap.mail.me.com");
        assert_eq!(session.port, 993);
        assert_eq!(session.command_timeout, std::time::Duration::from_secs(12));
        assert_eq!(session.connect_timeout, std::time::Duration::from_secs(12));
        assert!(session.auto_reconnect);
    }
}
