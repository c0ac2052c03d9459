//! Message commands, valid while a mailbox is selected.
//!
//! Every command addresses messages by UID.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Selected;
use crate::command::{Command, FetchAttribute, SearchCriteria, StoreAction};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Mailbox, Uid, UidSet};
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.state.mailbox()
    }

    /// True if the mailbox is open read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.state.is_read_only()
    }

    /// Runs UID SEARCH and returns the matching UIDs in server order.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>> {
        let completion = self
            .execute(&Command::UidSearch {
                criteria: criteria.clone(),
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|data| match data {
                UntaggedResponse::Search(nums) => Some(nums),
                _ => None,
            })
            .flatten()
            .filter_map(Uid::new)
            .collect())
    }

    /// Runs UID FETCH and returns the item list of every message that
    /// answered. Unsolicited FETCH data (flag updates from other clients)
    /// is included; callers key on the `UID` item.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        items: &[FetchAttribute],
    ) -> Result<Vec<Vec<FetchItem>>> {
        let completion = self
            .execute(&Command::UidFetch {
                uids: uids.clone(),
                items: items.to_vec(),
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|data| match data {
                UntaggedResponse::Fetch { items, .. } => Some(items),
                _ => None,
            })
            .collect())
    }

    /// Changes flags with `UID STORE ... .SILENT`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, a non-OK completion, or a read-only mailbox.
    pub async fn uid_store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        self.require_writable("UID STORE")?;
        self.execute(&Command::UidStore {
            uids: uids.clone(),
            action,
            silent: true,
        })
        .await
        .map(drop)
    }

    /// Copies messages to `target`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn uid_copy(&mut self, uids: &UidSet, target: &str) -> Result<()> {
        self.execute(&Command::UidCopy {
            uids: uids.clone(),
            mailbox: Mailbox::new(target),
        })
        .await
        .map(drop)
    }

    /// Moves messages to `target` with UID MOVE (RFC 6851).
    ///
    /// # Errors
    ///
    /// Fails when the server lacks MOVE, on I/O errors, or on a non-OK
    /// completion.
    pub async fn uid_move(&mut self, uids: &UidSet, target: &str) -> Result<()> {
        if !self.supports_move() {
            return Err(Error::InvalidState("server does not support MOVE".to_string()));
        }
        self.require_writable("UID MOVE")?;
        self.execute(&Command::UidMove {
            uids: uids.clone(),
            mailbox: Mailbox::new(target),
        })
        .await
        .map(drop)
    }

    /// Removes every `\Deleted` message; returns how many went away.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn expunge(&mut self) -> Result<usize> {
        let completion = self.execute(&Command::Expunge).await?;
        Ok(count_expunged(&completion.untagged))
    }

    /// Removes the given `\Deleted` messages only (RFC 4315).
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn uid_expunge(&mut self, uids: &UidSet) -> Result<usize> {
        let completion = self
            .execute(&Command::UidExpunge { uids: uids.clone() })
            .await?;
        Ok(count_expunged(&completion.untagged))
    }

    fn require_writable(&self, what: &str) -> Result<()> {
        if self.is_read_only() {
            Err(Error::InvalidState(format!(
                "{what} needs {} opened read-write",
                self.mailbox()
            )))
        } else {
            Ok(())
        }
    }
}

fn count_expunged(untagged: &[UntaggedResponse]) -> usize {
    untagged
        .iter()
        .filter(|data| matches!(data, UntaggedResponse::Expunge(_)))
        .count()
}
