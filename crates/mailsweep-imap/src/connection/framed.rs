//! Framed I/O for the IMAP wire format.
//!
//! Responses are CRLF-terminated lines that may embed `{n}` literals.
//! [`FramedStream::read_response`] returns one complete response with its
//! literals inlined, ready for the sans-I/O parser.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{ResponseCode, Status};
use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Upper bound for a single line.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Upper bound for one literal. Only header fields are ever fetched, so
/// anything near this size is a misbehaving server.
const MAX_LITERAL_SIZE: usize = 16 * 1024 * 1024;

/// Buffered reader/writer speaking IMAP framing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
        }
    }

    /// Reads one complete response, following any literals.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on EOF, and when a line or literal exceeds the
    /// size limits.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(literal_len) = parse_literal_length(&line) else {
                break;
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }
            let start = response.len();
            response.resize(start + literal_len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }

        Ok(response)
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }

            // A CR may end one read and its LF start the next.
            let scan_from = usize::from(line.last() == Some(&b'\r'));
            if scan_from == 1 && buf[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                break;
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        Ok(line)
    }

    /// Writes and flushes one serialized command.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Reads responses until the completion for `tag` arrives.
    ///
    /// Untagged data is parsed and collected; lines that do not parse are
    /// logged and skipped. If the server says BYE and then closes the
    /// connection, the BYE text is reported instead of a bare EOF.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on an unparseable completion line, and with
    /// [`Error::Bye`] when the server hangs up mid-command.
    pub async fn read_completion(&mut self, tag: &str) -> Result<Completion> {
        let mut untagged = Vec::new();
        let mut farewell: Option<String> = None;

        loop {
            let raw = match self.read_response().await {
                Ok(raw) => raw,
                Err(Error::Io(e)) if farewell.is_some() => {
                    tracing::debug!(error = %e, "connection closed after BYE");
                    return Err(Error::Bye(farewell.unwrap_or_default()));
                }
                Err(e) => return Err(e),
            };

            if is_tagged_for(&raw, tag) {
                return match ResponseParser::parse(&raw)? {
                    Response::Tagged {
                        status, code, text, ..
                    } => Ok(Completion {
                        untagged,
                        status,
                        code,
                        text,
                    }),
                    _ => Err(Error::Protocol("malformed tagged response".to_string())),
                };
            }

            match ResponseParser::parse(&raw) {
                Ok(Response::Untagged(data)) => {
                    if let UntaggedResponse::Bye { text, .. } = &data {
                        farewell = Some(text.clone());
                    }
                    untagged.push(data);
                }
                Ok(other) => tracing::debug!(?other, "ignoring unexpected response"),
                Err(e) => {
                    tracing::debug!(error = %e, line = %String::from_utf8_lossy(&raw).trim_end(), "skipping unparseable response");
                }
            }
        }
    }

    /// Returns the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }
}

/// Everything the server sent for one command.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Untagged data received before the completion.
    pub untagged: Vec<UntaggedResponse>,
    /// Completion status.
    pub status: Status,
    /// Response code of the completion.
    pub code: Option<ResponseCode>,
    /// Completion text.
    pub text: String,
}

impl Completion {
    /// Converts a non-OK completion into the matching error.
    ///
    /// # Errors
    ///
    /// NO, BAD and BYE map to [`Error::No`], [`Error::Bad`] and [`Error::Bye`].
    pub fn into_ok(self) -> Result<Self> {
        match self.status {
            Status::Ok | Status::PreAuth => Ok(self),
            Status::No => Err(Error::No(self.text)),
            Status::Bad => Err(Error::Bad(self.text)),
            Status::Bye => Err(Error::Bye(self.text)),
        }
    }
}

fn is_tagged_for(response: &[u8], tag: &str) -> bool {
    response
        .strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Extracts `n` from a line ending in `{n}\r\n` or `{n+}\r\n`.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"just\n"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY[HEADER] {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY[HEADER] {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(parse_literal_length(b"empty {}\r\n"), None);
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_read_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[HEADER] {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(
            framed.read_response().await.unwrap(),
            b"* 1 FETCH (BODY[HEADER] {5}\r\nhello)\r\n"
        );
    }

    #[tokio::test]
    async fn test_oversized_literal_is_rejected() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_read_completion_collects_untagged() {
        let mock = Builder::new()
            .read(b"* SEARCH 3 4\r\n")
            .read(b"* ENABLED X\r\n")
            .read(b"A0001 OK SEARCH done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let completion = framed.read_completion("A0001").await.unwrap();
        assert_eq!(completion.status, Status::Ok);
        assert_eq!(completion.untagged.len(), 2);
        assert_eq!(completion.untagged[0], UntaggedResponse::Search(vec![3, 4]));
    }

    #[tokio::test]
    async fn test_completion_for_other_tag_is_not_ours() {
        let mock = Builder::new()
            .read(b"A00010 OK not ours\r\n")
            .read(b"A0001 NO nope\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let completion = framed.read_completion("A0001").await.unwrap();
        assert!(matches!(completion.into_ok(), Err(Error::No(text)) if text == "nope"));
    }

    #[tokio::test]
    async fn test_bye_then_eof_reports_bye() {
        let mock = Builder::new()
            .read(b"* BYE server shutting down\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_completion("A0001").await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "server shutting down"));
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new()
            .write(b"A0001 NOOP\r\n")
            .write(b"A0002 LOGOUT\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        framed.write_command(b"A0001 NOOP\r\n").await.unwrap();
        framed.write_command(b"A0002 LOGOUT\r\n").await.unwrap();
    }
}
