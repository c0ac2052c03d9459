//! Server capabilities and completion status.

/// Status of a tagged completion or untagged condition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Connection is already authenticated.
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

impl Status {
    /// Returns true for OK and PREAUTH.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// A capability advertised by the server.
///
/// Only capabilities that change how commands are issued get their own
/// variant; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// MOVE extension (RFC 6851)
    Move,
    /// UIDPLUS extension (RFC 4315), enables UID EXPUNGE
    UidPlus,
    /// LOGIN command disabled
    LoginDisabled,
    /// Anything else
    Other(String),
}

impl Capability {
    /// Parses a capability atom, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "MOVE" => Self::Move,
            "UIDPLUS" => Self::UidPlus,
            "LOGINDISABLED" => Self::LoginDisabled,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => f.write_str("IMAP4rev1"),
            Self::Move => f.write_str("MOVE"),
            Self::UidPlus => f.write_str("UIDPLUS"),
            Self::LoginDisabled => f.write_str("LOGINDISABLED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_capabilities() {
        assert_eq!(Capability::parse("move"), Capability::Move);
        assert_eq!(Capability::parse("UIDPLUS"), Capability::UidPlus);
        assert_eq!(Capability::parse("IMAP4rev1"), Capability::Imap4Rev1);
    }

    #[test]
    fn display_round_trips_known_atoms() {
        assert_eq!(Capability::parse("uidplus").to_string(), "UIDPLUS");
        assert_eq!(Capability::parse("logindisabled"), Capability::LoginDisabled);
    }

    #[test]
    fn unknown_capability_is_preserved() {
        let cap = Capability::parse("X-GM-EXT-1");
        assert_eq!(cap, Capability::Other("X-GM-EXT-1".to_string()));
        assert_eq!(cap.to_string(), "X-GM-EXT-1");
    }

    #[test]
    fn status_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
        assert!(!Status::Bye.is_ok());
    }
}
