//! Mailbox operations the pipeline is built from.
//!
//! Read operations degrade instead of failing: a search that cannot be
//! completed yields no UIDs and a header that cannot be fetched yields no
//! sender, so one bad message or query never stops a folder.

use std::collections::{BTreeSet, HashMap};

use mailsweep_imap::{Flag, SearchCriteria, StoreAction, Uid};
use mailsweep_mime::Headers;

use crate::error::Result;
use crate::pool::SessionPool;
use crate::session::{Connector, MailSession};

/// Header fields fetched per message.
pub const HEADER_FIELDS: [&str; 2] = ["FROM", "SUBJECT"];

/// Sender and subject of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRecord {
    /// Raw `From` value.
    pub from: Option<String>,
    /// Decoded, trimmed `Subject`.
    pub subject: Option<String>,
}

/// True if `name` exists on the server.
///
/// # Errors
///
/// Fails when the folder list cannot be read.
pub async fn folder_exists<S: MailSession + ?Sized>(session: &mut S, name: &str) -> Result<bool> {
    let folders = session.list_folders().await?;
    Ok(folders.iter().any(|folder| folder == name))
}

/// Creates `name` unless it exists. Returns true if it was created.
///
/// # Errors
///
/// Fails when listing or creating fails.
pub async fn ensure_folder_exists<S: MailSession + ?Sized>(
    session: &mut S,
    name: &str,
) -> Result<bool> {
    if folder_exists(session, name).await? {
        return Ok(false);
    }
    session.create_folder(name).await?;
    tracing::info!(folder = name, "created folder");
    Ok(true)
}

/// Runs searches in one folder on one session.
///
/// The folder is opened read-only before the first search and again only
/// after a network fault. Network faults on either command are retried
/// until `max_attempts` attempts were made in total; after that, and after
/// any other failure, a search yields nothing. A folder the server refuses
/// to open is marked unavailable and every later search is skipped.
pub struct FolderSearch<'a, S: MailSession + ?Sized> {
    session: &'a mut S,
    folder: &'a str,
    max_attempts: u32,
    open: bool,
    unavailable: bool,
}

impl<'a, S: MailSession + ?Sized> FolderSearch<'a, S> {
    /// Starts searching `folder`; nothing is sent until the first search.
    #[must_use]
    pub fn new(session: &'a mut S, folder: &'a str, max_attempts: u32) -> Self {
        Self {
            session,
            folder,
            max_attempts: max_attempts.max(1),
            open: false,
            unavailable: false,
        }
    }

    /// True once the server refused to open the folder.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Runs one search.
    pub async fn search(&mut self, query: &SearchCriteria) -> BTreeSet<Uid> {
        let folder = self.folder;
        if self.unavailable {
            return BTreeSet::new();
        }

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tracing::debug!(folder, attempt, "retrying search");
            }

            if !self.open {
                match self.session.examine(folder).await {
                    Ok(()) => self.open = true,
                    Err(e) if e.is_transient() => {
                        tracing::debug!(folder, attempt, error = %e, "open hit a network fault");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(folder, error = %e, "could not open folder, skipping");
                        self.unavailable = true;
                        return BTreeSet::new();
                    }
                }
            }

            match self.session.uid_search(query).await {
                Ok(uids) => return uids.into_iter().collect(),
                Err(e) if e.is_transient() => {
                    tracing::debug!(folder, attempt, error = %e, "search hit a network fault");
                    self.open = false;
                }
                Err(e) => {
                    tracing::debug!(folder, error = %e, "search failed");
                    return BTreeSet::new();
                }
            }
        }

        tracing::warn!(
            folder,
            attempts = self.max_attempts,
            "search failed on every attempt, skipping"
        );
        BTreeSet::new()
    }

    /// Runs `queries` one after another and unions the results.
    pub async fn union(&mut self, queries: &[SearchCriteria]) -> BTreeSet<Uid> {
        let mut found = BTreeSet::new();
        for (index, query) in queries.iter().enumerate() {
            if queries.len() > 5 {
                tracing::debug!(
                    folder = self.folder,
                    query = index + 1,
                    total = queries.len(),
                    "running search"
                );
            }
            found.extend(self.search(query).await);
        }
        found
    }
}

/// Opens `folder` read-only and runs one search, with the retry policy of
/// [`FolderSearch`].
pub async fn search_uids<S: MailSession + ?Sized>(
    session: &mut S,
    folder: &str,
    query: &SearchCriteria,
    max_attempts: u32,
) -> BTreeSet<Uid> {
    FolderSearch::new(session, folder, max_attempts)
        .search(query)
        .await
}

/// Opens `folder` once and unions the results of `queries`.
pub async fn union_searches<S: MailSession + ?Sized>(
    session: &mut S,
    folder: &str,
    queries: &[SearchCriteria],
    max_attempts: u32,
) -> BTreeSet<Uid> {
    FolderSearch::new(session, folder, max_attempts)
        .union(queries)
        .await
}

/// Fetches `From` and `Subject` of one message without marking it seen.
///
/// Any failure gives an empty record.
pub async fn fetch_headers<S: MailSession + ?Sized>(session: &mut S, uid: Uid) -> HeaderRecord {
    match session.fetch_header_block(uid, &HEADER_FIELDS).await {
        Ok(Some(block)) => parse_header_block(&block),
        Ok(None) => {
            tracing::debug!(uid = uid.get(), "no header data returned");
            HeaderRecord::default()
        }
        Err(e) => {
            tracing::debug!(uid = uid.get(), error = %e, "header fetch failed");
            HeaderRecord::default()
        }
    }
}

/// Fetches headers for `uids` on one pooled session, opening `folder`
/// read-only once.
///
/// A folder that cannot be opened gives an empty map.
///
/// # Errors
///
/// Fails only when no session can be acquired.
pub async fn fetch_headers_batch<C: Connector>(
    pool: &SessionPool<C>,
    folder: &str,
    uids: &[Uid],
) -> Result<HashMap<Uid, HeaderRecord>> {
    let mut session = pool.acquire().await?;
    let mut records = HashMap::with_capacity(uids.len());

    match session.examine(folder).await {
        Ok(()) => {
            for &uid in uids {
                records.insert(uid, fetch_headers(&mut *session, uid).await);
            }
        }
        Err(e) => {
            tracing::warn!(folder, batch = uids.len(), error = %e, "could not open folder for header fetch");
        }
    }

    pool.release(session).await;
    Ok(records)
}

/// Moves one message to `target` from the folder opened read-write.
///
/// Uses MOVE when the server has it. Without MOVE, or when MOVE is
/// refused, copies the message, flags it `\Deleted` and expunges: only
/// this UID with UIDPLUS, the whole folder without it. Returns whether
/// the message left the folder.
pub async fn move_message<S: MailSession + ?Sized>(session: &mut S, uid: Uid, target: &str) -> bool {
    if session.supports_move() {
        match session.uid_move(uid, target).await {
            Ok(()) => return true,
            Err(e) => {
                tracing::debug!(uid = uid.get(), error = %e, "MOVE failed, trying copy and delete");
            }
        }
    }

    if let Err(e) = session.uid_copy(uid, target).await {
        tracing::warn!(uid = uid.get(), target, error = %e, "copy failed");
        return false;
    }
    if let Err(e) = session
        .uid_store(uid, StoreAction::AddFlags(vec![Flag::Deleted]))
        .await
    {
        tracing::warn!(uid = uid.get(), error = %e, "could not flag copied message as deleted");
        return false;
    }

    let purged = if session.supports_uidplus() {
        session.uid_expunge(uid).await
    } else {
        session.expunge().await
    };
    match purged {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(uid = uid.get(), error = %e, "expunge failed after copy");
            false
        }
    }
}

fn parse_header_block(block: &[u8]) -> HeaderRecord {
    let headers = Headers::parse_bytes(block);
    HeaderRecord {
        from: headers
            .get("From")
            .map(str::trim)
            .filter(|from| !from.is_empty())
            .map(str::to_string),
        subject: headers.get_decoded("Subject"),
    }
}
