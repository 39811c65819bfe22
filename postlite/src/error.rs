//! `postlite` error types.
use std::io;

use crate::{
    connection::{ParseError, SessionState},
    message::backend::ErrorResponse,
};

/// A specialized [`Result`] type for `postlite` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from the `postlite` library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport open, send, or receive failure. Never retried here;
    /// retry policy belongs to the caller.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// A received buffer does not match its declared framing. The session
    /// is desynchronized and should be torn down, not resumed.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// An operation was invoked outside its valid session state.
    #[error(transparent)]
    State(#[from] ProtocolStateError),

    /// Malformed connection url or environment.
    #[error("configuration error: {0:#}")]
    Config(#[from] ParseError),

    /// The server demanded an authentication exchange this client does not
    /// implement (only trust/no-password startup is supported).
    #[error("unsupported authentication request: code {0}")]
    UnsupportedAuth(i32),

    /// The server reported an error.
    #[error("server error: {0}")]
    Database(#[from] ErrorResponse),
}

/// A received buffer's declared length does not match the bytes available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// The length field computes to an implausible size; it must count
    /// at least its own four bytes.
    #[error("implausible message length: {0} (minimum 4)")]
    Length(usize),

    /// The buffer ends before the declared message size.
    #[error("truncated message: {got} of {need} bytes available")]
    Truncated { need: usize, got: usize },

    /// A message body does not match the layout its tag declares.
    #[error("malformed message body: {0}")]
    Malformed(&'static str),
}

/// An operation was invoked outside its valid state: a local contract
/// violation, not a network condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{op} is not valid in the {state:?} session state")]
pub struct ProtocolStateError {
    pub op: &'static str,
    pub state: SessionState,
}
