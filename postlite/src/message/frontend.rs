//! Frontend (client to server) messages.
use bytes::{BufMut, BytesMut};

use super::{BufMutExt, FrontendMessage};
use crate::frame;

/// Protocol version 3.0, sent as 2-byte major then 2-byte minor.
const PROTOCOL_MAJOR: u16 = 3;
const PROTOCOL_MINOR: u16 = 0;

/// The startup message, the first message sent by the client.
///
/// It carries no message-type byte: its payload is the protocol version
/// followed by NUL-terminated parameter name/value pairs and a final NUL.
///
/// <https://www.postgresql.org/docs/current/protocol-message-formats.html#PROTOCOL-MESSAGE-FORMATS-STARTUPMESSAGE>
#[derive(Debug)]
pub struct Startup<'a> {
    /// The database user name to connect as. Required; there is no default.
    pub user: &'a str,
    /// The database to connect to.
    pub database: &'a str,
}

impl FrontendMessage for Startup<'_> {
    fn encode(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::with_capacity(64);

        // Int32 The protocol version number. The most significant 16 bits
        // are the major version number, the least significant 16 the minor.
        payload.put_u16(PROTOCOL_MAJOR);
        payload.put_u16(PROTOCOL_MINOR);

        // Pairs of parameter name and value strings.
        payload.put_nul_str("database");
        payload.put_nul_str(self.database);
        payload.put_nul_str("user");
        payload.put_nul_str(self.user);

        // A zero byte terminator after the last name/value pair.
        payload.put_u8(b'\0');

        frame::write(None, &payload, buf);
    }
}

/// Identifies the message as a simple query.
#[derive(Debug)]
pub struct Query<'a> {
    /// The query string itself.
    pub sql: &'a str,
}

impl Query<'_> {
    pub const TAG: u8 = b'Q';
}

impl FrontendMessage for Query<'_> {
    fn encode(&self, buf: &mut BytesMut) {
        // String The query string itself, C style.
        let mut payload = BytesMut::with_capacity(self.sql.len() + 1);
        payload.put_nul_str(self.sql);

        frame::write(Some(Self::TAG), &payload, buf);
    }
}

/// Identifies the message as a termination. The payload is empty; the
/// server closes the connection in response.
#[derive(Debug)]
pub struct Terminate;

impl Terminate {
    pub const TAG: u8 = b'X';
}

impl FrontendMessage for Terminate {
    fn encode(&self, buf: &mut BytesMut) {
        frame::write(Some(Self::TAG), &[], buf);
    }
}
