//! Type-state IMAP client.
//!
//! The connection state is part of the type:
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after LOGIN
//! - `Selected`: after SELECT/EXAMINE
//!
//! Each state only exposes the commands valid in it. Transitions consume
//! the client; a transition the server refuses hands the client back in
//! the state the protocol leaves it in.

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::states::{Authenticated, MailboxAccess, NotAuthenticated, Selected};
use super::framed::{Completion, FramedStream};
use crate::command::{Command, TagGenerator};
use crate::parser::UntaggedResponse;
use crate::types::{Capability, ResponseCode};
use crate::{Error, Result};

/// IMAP client in connection state `State`.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// A refused SELECT or EXAMINE.
///
/// `client` is present when the server answered (the connection is still
/// usable and back in the authenticated state) and absent when the
/// connection itself failed.
pub struct SelectError<S> {
    /// Why the mailbox could not be opened.
    pub error: Error,
    /// The client, if the connection survived.
    pub client: Option<Client<S, Authenticated>>,
}

impl<S> std::fmt::Debug for SelectError<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectError")
            .field("error", &self.error)
            .field("client", &self.client.is_some())
            .finish()
    }
}

impl<S> From<SelectError<S>> for Error {
    fn from(err: SelectError<S>) -> Self {
        err.error
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Server capabilities as last reported.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks for a capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// True if UID MOVE (RFC 6851) is available.
    #[must_use]
    pub fn supports_move(&self) -> bool {
        self.has_capability(&Capability::Move)
    }

    /// True if UID EXPUNGE (RFC 4315) is available.
    #[must_use]
    pub fn supports_uidplus(&self) -> bool {
        self.has_capability(&Capability::UidPlus)
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await.map(drop)
    }

    /// Refreshes the capability list.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a non-OK completion.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let completion = self.execute(&Command::Capability).await?;
        self.absorb_capabilities(&completion);
        Ok(self.capabilities.clone())
    }

    /// Says goodbye and drops the connection.
    ///
    /// The server's answer is not awaited beyond its completion; a server
    /// that hangs up right after BYE is not an error.
    ///
    /// # Errors
    ///
    /// Fails only if LOGOUT cannot be written.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tag_gen.next_tag();
        self.stream
            .write_command(&Command::Logout.serialize(&tag))
            .await?;
        let _ = self.stream.read_completion(&tag).await;
        Ok(())
    }

    /// Sends a command and waits for its completion, mapping non-OK
    /// completions to errors.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        self.send(command).await?.into_ok()
    }

    /// Sends a command and returns its completion whatever the status.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.tag_gen.next_tag();
        tracing::trace!(%tag, command = command.name(), "sending");
        self.stream.write_command(&command.serialize(&tag)).await?;
        let completion = self.stream.read_completion(&tag).await?;
        tracing::trace!(%tag, status = ?completion.status, "completed");
        Ok(completion)
    }

    /// Picks up capabilities announced in untagged data or in the
    /// completion's response code.
    pub(crate) fn absorb_capabilities(&mut self, completion: &Completion) {
        for data in &completion.untagged {
            if let UntaggedResponse::Capability(caps) = data {
                self.capabilities.clone_from(caps);
            }
        }
        if let Some(ResponseCode::Capability(caps)) = &completion.code {
            self.capabilities.clone_from(caps);
        }
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state,
        }
    }
}
