//! # mailsweep-mime
//!
//! Just enough message-header handling to classify mail from a header-only
//! fetch:
//!
//! - [`Headers`]: parse a raw header block (unfolding continuation lines)
//! - [`encoding`]: RFC 2047 encoded-word decoding
//! - [`Address`]: the sender address and domain from a `From:` value
//!
//! ```
//! use mailsweep_mime::{Address, Headers};
//!
//! let headers = Headers::parse("From: Shop <Deals@Shop.Example>\r\nSubject: =?utf-8?Q?50=25_off?=\r\n\r\n");
//! let from = Address::parse(headers.get("From").unwrap_or_default());
//! assert_eq!(from.domain, "shop.example");
//! assert_eq!(headers.get_decoded("Subject").as_deref(), Some("50% off"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod error;
mod header;

pub mod encoding;

pub use address::Address;
pub use encoding::decode_rfc2047;
pub use error::{Error, Result};
pub use header::Headers;
