//! Typed protocol messages.
//!
//! Frontend messages serialize through the framing layer in [`frame`];
//! backend messages classify the frames [`frame::parse`] or
//! [`Transport::recv_message`] produce.
//!
//! [`frame`]: crate::frame
//! [`frame::parse`]: crate::frame::parse
//! [`Transport::recv_message`]: crate::transport::Transport::recv_message

pub mod backend;
pub mod frontend;

pub use backend::{BackendMessage, ErrorResponse, TransactionStatus};
pub use frontend::{Query, Startup, Terminate};

use bytes::{BufMut, BytesMut};

/// Buffered encoding of a complete framed frontend message.
pub trait FrontendMessage {
    /// Serialize the message, framing included, into `buf`.
    fn encode(&self, buf: &mut BytesMut);
}

pub(crate) trait BufMutExt {
    /// Protocol strings are NUL terminated.
    fn put_nul_str(&mut self, string: &str);
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_str(&mut self, string: &str) {
        self.put_slice(string.as_bytes());
        self.put_u8(b'\0');
    }
}
