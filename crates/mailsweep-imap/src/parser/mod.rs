//! Sans-I/O parser for server responses.
//!
//! The lexer turns one response into tokens; the response parser builds
//! typed [`Response`] values from them. Neither touches the network.

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{FetchItem, Response, ResponseParser, UntaggedResponse};
