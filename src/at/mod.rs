//! AT command layer
//!
//! [`AtChannel`] owns a [`Transport`](crate::transport::Transport) and runs
//! commands against it one at a time, while a reader thread routes
//! everything the modem sends on its own (registration changes, incoming SMS
//! notifications, `RING`) to registered unsolicited handlers.
//!
//! [`AtParser`] tokenizes the reply lines collected in a [`Response`]:
//!
//! ```rust
//! use usbmodem::at::AtParser;
//!
//! let mut parser = AtParser::new("+CREG: 2,1,\"00C3\",\"0010F2A1\",7");
//! let mut mode = 0;
//! let mut stat = 0;
//! let mut lac = 0;
//! parser
//!     .parse_int(&mut mode)
//!     .parse_int(&mut stat)
//!     .parse_uint_radix(&mut lac, 16);
//! assert!(parser.success());
//! assert_eq!((mode, stat, lac), (2, 1, 0xC3));
//! ```

mod channel;
mod config;
mod error;
mod parser;
mod response;
mod semaphore;
mod unsolicited;

pub use channel::{AtChannel, ErrorHandler, IoBrokenHandler, ResultKind, TimeoutResolver};
pub use config::ChannelConfig;
pub use error::{AtError, AtResult};
pub use parser::{AtParseError, AtParser};
pub use response::{Response, ResultCode};
pub use semaphore::Semaphore;
pub use unsolicited::{UnsolicitedHandler, UnsolicitedRegistry};
