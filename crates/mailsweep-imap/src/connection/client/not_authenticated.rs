//! Greeting and login.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the server greeting from a freshly connected stream.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, when the server greets with BYE, and when the
    /// greeting is not a status response.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => match code {
                Some(ResponseCode::Capability(caps)) => caps,
                _ => Vec::new(),
            },
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                return Err(Error::Bye(text));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        })
    }

    /// Logs in with LOGIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when the server rejects the credentials or
    /// advertises LOGINDISABLED, and other errors on I/O failures.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::Auth("server advertises LOGINDISABLED".to_string()));
        }

        let completion = self
            .send(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        match completion.status {
            Status::Ok | Status::PreAuth => {}
            Status::No => return Err(Error::Auth(completion.text)),
            Status::Bad => return Err(Error::Bad(completion.text)),
            Status::Bye => return Err(Error::Bye(completion.text)),
        }

        // Servers often advertise more after login (MOVE, UIDPLUS).
        let announced = completion
            .untagged
            .iter()
            .any(|data| matches!(data, UntaggedResponse::Capability(_)))
            || matches!(completion.code, Some(ResponseCode::Capability(_)));
        self.absorb_capabilities(&completion);

        let mut client = self.transition(Authenticated);
        if !announced {
            client.capability().await?;
        }
        Ok(client)
    }
}
