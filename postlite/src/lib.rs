//! Minimal synchronous Postgres frontend-protocol client.
//!
//! Speaks the startup, simple-query, and termination flows of the
//! frontend/backend protocol over a Unix domain socket or TCP stream,
//! blocking on every exchange. The core is the framing layer in [`frame`]:
//! length-prefixed message encoding, and splitting a received byte stream
//! (possibly several messages concatenated in one read) back into discrete
//! typed messages.
//!
//! Authentication is trust/no-password only, and result rows are carried
//! raw: decoding them into typed values belongs to a higher layer.
//!
//! # Examples
//!
//! ```no_run
//! use postlite::{Config, Session};
//!
//! # fn app() -> postlite::Result<()> {
//! let mut session = Session::connect(Config::from_env())?;
//!
//! session.startup()?;
//!
//! for message in session.query("SELECT version()")? {
//!     println!("{message:?}");
//! }
//!
//! session.terminate()?;
//! # Ok(())
//! # }
//! ```

// Framing
pub mod frame;

// Protocol
pub mod message;

// Connection
pub mod connection;
pub mod transport;

mod error;

pub use connection::{Config, Session, SessionState};
pub use error::{Error, FramingError, ProtocolStateError, Result};
pub use frame::{Framing, Message};
pub use message::{BackendMessage, FrontendMessage};
