//! Mailbox-level commands, valid once logged in.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, MailboxAccess, Selected};
use super::{Client, SelectError};
use crate::command::Command;
use crate::connection::framed::Completion;
use crate::parser::UntaggedResponse;
use crate::types::{ListResponse, Mailbox, MailboxStatus, ResponseCode, Status};
use crate::{Error, Result};

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
    State: MailboxAccess,
{
    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let completion = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|data| match data {
                UntaggedResponse::List(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Creates a mailbox.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or when the server refuses (including when the
    /// mailbox already exists).
    pub async fn create(&mut self, mailbox: &str) -> Result<()> {
        self.execute(&Command::Create {
            mailbox: Mailbox::new(mailbox),
        })
        .await
        .map(drop)
    }

    /// Opens a mailbox read-write.
    ///
    /// # Errors
    ///
    /// See [`SelectError`].
    pub async fn select(
        self,
        mailbox: &str,
    ) -> std::result::Result<(Client<S, Selected>, MailboxStatus), SelectError<S>> {
        self.open(mailbox, false).await
    }

    /// Opens a mailbox read-only.
    ///
    /// # Errors
    ///
    /// See [`SelectError`].
    pub async fn examine(
        self,
        mailbox: &str,
    ) -> std::result::Result<(Client<S, Selected>, MailboxStatus), SelectError<S>> {
        self.open(mailbox, true).await
    }

    pub(crate) async fn open(
        mut self,
        mailbox: &str,
        read_only: bool,
    ) -> std::result::Result<(Client<S, Selected>, MailboxStatus), SelectError<S>> {
        let name = Mailbox::new(mailbox);
        let command = if read_only {
            Command::Examine { mailbox: name }
        } else {
            Command::Select { mailbox: name }
        };

        let completion = match self.send(&command).await {
            Ok(completion) => completion,
            Err(error) => {
                return Err(SelectError {
                    error,
                    client: None,
                });
            }
        };

        // A refused SELECT leaves no mailbox selected, whatever was before.
        let error = match completion.status {
            Status::Ok | Status::PreAuth => None,
            Status::No => Some(Error::No(completion.text.clone())),
            Status::Bad => Some(Error::Bad(completion.text.clone())),
            Status::Bye => {
                return Err(SelectError {
                    error: Error::Bye(completion.text),
                    client: None,
                });
            }
        };
        if let Some(error) = error {
            return Err(SelectError {
                error,
                client: Some(self.transition(Authenticated)),
            });
        }

        let status = mailbox_status(&completion, read_only);
        let selected = Selected {
            mailbox: mailbox.to_string(),
            read_only: status.read_only,
        };
        Ok((self.transition(selected), status))
    }
}

/// Collects the mailbox snapshot sent with a SELECT/EXAMINE completion.
fn mailbox_status(completion: &Completion, requested_read_only: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only: requested_read_only,
        ..MailboxStatus::default()
    };

    for data in &completion.untagged {
        match data {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags.clone_from(flags),
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(v) => status.uid_next = Some(*v),
                _ => {}
            },
            _ => {}
        }
    }

    match completion.code {
        Some(ResponseCode::ReadOnly) => status.read_only = true,
        Some(ResponseCode::ReadWrite) => status.read_only = false,
        _ => {}
    }

    status
}
