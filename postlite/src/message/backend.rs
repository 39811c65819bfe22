//! Backend (server to client) messages.
use std::{collections::HashMap, fmt};

use bytes::{Buf, Bytes};

use crate::{error::FramingError, frame::Message};

/// Backend transaction status, carried by `ReadyForQuery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Not in a transaction block.
    Idle,
    /// In a transaction block.
    Transaction,
    /// In a failed transaction block; queries are rejected until the
    /// block ends.
    Failed,
}

/// A backend message, classified by its type byte.
///
/// Classification stops at the depth the session flows need: anything
/// row-shaped is carried raw, since decoding result rows into typed values
/// belongs to a higher layer.
///
/// <https://www.postgresql.org/docs/current/protocol-message-formats.html>
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// `'R'` — authentication request. Code 0 means the exchange is
    /// complete; any other code starts a challenge this client does not
    /// implement.
    Authentication(i32),
    /// `'S'` — run-time parameter status report.
    ParameterStatus { name: String, value: String },
    /// `'K'` — cancellation key data for this backend.
    BackendKeyData { process_id: i32, secret_key: i32 },
    /// `'Z'` — ready for a new query cycle.
    ReadyForQuery(TransactionStatus),
    /// `'E'` — server error report.
    ErrorResponse(ErrorResponse),
    /// `'N'` — server notice, carried raw.
    NoticeResponse(Bytes),
    /// `'T'` — row description, carried raw.
    RowDescription(Bytes),
    /// `'D'` — data row, carried raw.
    DataRow(Bytes),
    /// `'C'` — command completed, with its command tag.
    CommandComplete(String),
    /// Any message type this client does not interpret.
    Unknown { tag: u8, payload: Bytes },
}

impl BackendMessage {
    /// Classify a framed message by its type byte.
    ///
    /// The frame must be tagged: backend messages always are.
    pub fn classify(message: Message) -> Result<BackendMessage, FramingError> {
        let Some(tag) = message.tag() else {
            return Err(FramingError::Malformed("backend message without a type byte"));
        };
        let mut body = message.into_payload();

        Ok(match tag {
            b'R' => {
                if body.len() < 4 {
                    return Err(FramingError::Malformed("authentication body shorter than its code"));
                }
                Self::Authentication(body.get_i32())
            }
            b'S' => {
                let name = take_nul_string(&mut body)?;
                let value = take_nul_string(&mut body)?;
                Self::ParameterStatus { name, value }
            }
            b'K' => {
                if body.len() < 8 {
                    return Err(FramingError::Malformed("backend key data shorter than its two keys"));
                }
                Self::BackendKeyData {
                    process_id: body.get_i32(),
                    secret_key: body.get_i32(),
                }
            }
            b'Z' => {
                if body.is_empty() {
                    return Err(FramingError::Malformed("ready-for-query without a status byte"));
                }
                Self::ReadyForQuery(match body.get_u8() {
                    b'I' => TransactionStatus::Idle,
                    b'T' => TransactionStatus::Transaction,
                    b'E' => TransactionStatus::Failed,
                    _ => return Err(FramingError::Malformed("unknown transaction status")),
                })
            }
            b'E' => Self::ErrorResponse(ErrorResponse::decode(body)?),
            b'N' => Self::NoticeResponse(body),
            b'T' => Self::RowDescription(body),
            b'D' => Self::DataRow(body),
            b'C' => Self::CommandComplete(take_nul_string(&mut body)?),
            tag => Self::Unknown { tag, payload: body },
        })
    }
}

/// Server error report: one-byte field codes, each followed by a NUL
/// string, terminated by a zero code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub fields: HashMap<u8, String>,
}

impl ErrorResponse {
    /// The human-readable message field, when the server sent one.
    pub fn message(&self) -> Option<&str> {
        self.fields.get(&b'M').map(String::as_str)
    }

    /// The severity field (`ERROR`, `FATAL`, `PANIC`).
    pub fn severity(&self) -> Option<&str> {
        self.fields.get(&b'S').map(String::as_str)
    }

    fn decode(mut body: Bytes) -> Result<ErrorResponse, FramingError> {
        let mut fields = HashMap::new();
        loop {
            if body.is_empty() {
                return Err(FramingError::Malformed("error response missing its terminator"));
            }
            let code = body.get_u8();
            if code == b'\0' {
                break;
            }
            fields.insert(code, take_nul_string(&mut body)?);
        }
        Ok(ErrorResponse { fields })
    }
}

impl std::error::Error for ErrorResponse {}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.severity(), self.message()) {
            (Some(severity), Some(message)) => write!(f, "{severity}: {message}"),
            (None, Some(message)) => f.write_str(message),
            _ => write!(f, "{:?}", self.fields),
        }
    }
}

/// Take one NUL-terminated string off the front of `body`.
fn take_nul_string(body: &mut Bytes) -> Result<String, FramingError> {
    let Some(end) = memchr::memchr(b'\0', body) else {
        return Err(FramingError::Malformed("missing nul terminator"));
    };
    let raw = body.split_to(end);
    body.advance(1);
    String::from_utf8(raw.into()).map_err(|_| FramingError::Malformed("non UTF-8 string"))
}
