//! Session flows: startup, simple query, termination.
mod config;

pub use config::{Config, ParseError};

use crate::{
    error::{Error, ProtocolStateError, Result},
    message::{BackendMessage, Query, Startup, Terminate},
    transport::Transport,
};

/// Position of a session in the protocol lifecycle.
///
/// `Disconnected` exists only before [`Session::connect`] succeeds, and
/// the terminated state only after [`Session::terminate`] has consumed the
/// session, so neither needs a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, startup not yet sent.
    Connected,
    /// Startup sent, ready-for-query not yet observed.
    StartupSent,
    /// Handshake complete; queries may be issued.
    Ready,
}

/// A single blocking protocol session over one connection.
///
/// Operations are strictly sequential: every send blocks on reading the
/// complete reply before the next operation. A session is not shareable;
/// callers wanting concurrency open independent sessions.
#[derive(Debug)]
pub struct Session {
    transport: Transport,
    state: SessionState,
    config: Config,
}

impl Session {
    /// Open the transport described by `config`.
    pub fn connect(config: Config) -> Result<Session> {
        let transport = Transport::connect(&config)?;
        Ok(Session { transport, state: SessionState::Connected, config })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Perform the startup handshake.
    ///
    /// Sends the untagged startup message and reads backend messages until
    /// `ReadyForQuery`, which are returned for inspection. Authentication
    /// exchanges are not implemented: an authentication request with a
    /// nonzero code fails with [`Error::UnsupportedAuth`] rather than
    /// being silently accepted.
    pub fn startup(&mut self) -> Result<Vec<BackendMessage>> {
        if self.state != SessionState::Connected {
            return Err(ProtocolStateError { op: "startup", state: self.state }.into());
        }

        self.transport.send(Startup {
            user: &self.config.user,
            database: &self.config.dbname,
        })?;
        self.state = SessionState::StartupSent;

        let mut messages = Vec::new();
        loop {
            match self.recv()? {
                BackendMessage::Authentication(code) if code != 0 => {
                    return Err(Error::UnsupportedAuth(code));
                }
                BackendMessage::ErrorResponse(err) => {
                    // the server closes the connection after a startup
                    // failure, so there is no ready-for-query to wait on
                    return Err(Error::Database(err));
                }
                message @ BackendMessage::ReadyForQuery(_) => {
                    messages.push(message);
                    break;
                }
                message => messages.push(message),
            }
        }

        self.state = SessionState::Ready;
        log::debug!("startup complete, {} messages", messages.len());
        Ok(messages)
    }

    /// Issue one simple text query and read its complete response.
    ///
    /// Valid only once startup has completed; the session stays ready for
    /// further queries. A server error report is drained through to
    /// `ReadyForQuery`, then surfaced as [`Error::Database`].
    pub fn query(&mut self, sql: &str) -> Result<Vec<BackendMessage>> {
        if self.state != SessionState::Ready {
            return Err(ProtocolStateError { op: "query", state: self.state }.into());
        }

        self.transport.send(Query { sql })?;

        let mut messages = Vec::new();
        let mut failure = None;
        loop {
            match self.recv()? {
                BackendMessage::ErrorResponse(err) => failure = Some(err),
                message @ BackendMessage::ReadyForQuery(_) => {
                    messages.push(message);
                    break;
                }
                message => messages.push(message),
            }
        }

        match failure {
            Some(err) => Err(Error::Database(err)),
            None => Ok(messages),
        }
    }

    /// Send the termination message and close the connection.
    ///
    /// No reply is awaited; the server closes its end. Valid once startup
    /// has been sent, including after a failed handshake, so a session can
    /// always be shut down cleanly. Consumes the session; the socket is
    /// released when the transport drops.
    pub fn terminate(mut self) -> Result<()> {
        if self.state == SessionState::Connected {
            return Err(ProtocolStateError { op: "terminate", state: self.state }.into());
        }

        self.transport.send(Terminate)?;
        log::debug!("session terminated");
        Ok(())
    }

    fn recv(&mut self) -> Result<BackendMessage> {
        let message = BackendMessage::classify(self.transport.recv_message()?)?;
        log::trace!("received {message:?}");
        Ok(message)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::TransactionStatus;

    fn session(input: Vec<u8>) -> Session {
        Session {
            transport: Transport::mock(input),
            state: SessionState::Connected,
            config: Config::new("cliff", "cliff"),
        }
    }

    fn startup_burst() -> Vec<u8> {
        b"R\x00\x00\x00\x08\x00\x00\x00\x00\
          S\x00\x00\x00\x19client_encoding\x00UTF8\x00\
          K\x00\x00\x00\x0c\x00\x00\x17\xbb\x15b\xfb1\
          Z\x00\x00\x00\x05I"
            .to_vec()
    }

    fn query_burst() -> Vec<u8> {
        b"T\x00\x00\x00\x20\x00\x01version\x00\
          \x00\x00\x00\x00\x00\x00\x00\x00\x00\x19\xff\xff\xff\xff\xff\xff\x00\x00\
          D\x00\x00\x00\x10\x00\x01\x00\x00\x00\x06\x39\x2e\x36\x2e\x31\x00\
          C\x00\x00\x00\x0dSELECT 1\x00\
          Z\x00\x00\x00\x05I"
            .to_vec()
    }

    #[test]
    fn startup_reaches_ready() {
        let mut session = session(startup_burst());
        let messages = session.startup().unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(messages.first(), Some(&BackendMessage::Authentication(0)));
        assert_eq!(
            messages.last(),
            Some(&BackendMessage::ReadyForQuery(TransactionStatus::Idle)),
        );

        // untagged startup message: length field first, then version 3.0
        let sent = session.transport.sent();
        assert_eq!(&sent[..8], b"\x00\x00\x00\x23\x00\x03\x00\x00");
        assert_eq!(sent.len(), 0x23);
    }

    #[test]
    fn query_runs_after_startup() {
        let mut input = startup_burst();
        input.extend_from_slice(&query_burst());
        let mut session = session(input);

        session.startup().unwrap();
        let messages = session.query("SELECT version()").unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert!(messages.contains(&BackendMessage::CommandComplete("SELECT 1".into())));

        let sent = session.transport.sent();
        assert!(sent.ends_with(b"Q\x00\x00\x00\x15SELECT version()\x00"));
    }

    #[test]
    fn query_before_startup_is_a_state_error() {
        let mut session = session(Vec::new());
        assert!(matches!(
            session.query("SELECT 1"),
            Err(Error::State(ProtocolStateError { op: "query", state: SessionState::Connected })),
        ));
    }

    #[test]
    fn terminate_before_startup_is_a_state_error() {
        let session = session(Vec::new());
        assert!(matches!(session.terminate(), Err(Error::State(_))));
    }

    #[test]
    fn terminate_after_startup_succeeds() {
        let mut session = session(startup_burst());
        session.startup().unwrap();
        // the exact termination bytes are covered by the transport tests
        session.terminate().unwrap();
    }

    #[test]
    fn unsupported_auth_code_fails_startup() {
        // authentication request code 3: cleartext password
        let mut session = session(b"R\x00\x00\x00\x08\x00\x00\x00\x03".to_vec());
        assert!(matches!(session.startup(), Err(Error::UnsupportedAuth(3))));
        // the session did not reach ready, but can still be shut down
        assert_eq!(session.state(), SessionState::StartupSent);
        session.terminate().unwrap();
    }

    #[test]
    fn startup_error_response_fails_with_database_error() {
        let mut session = session(
            b"E\x00\x00\x00\x2aSFATAL\x00Mrole \"nobody\" does not exist\x00\x00".to_vec(),
        );
        assert!(matches!(session.startup(), Err(Error::Database(_))));
    }

    #[test]
    fn query_error_drains_to_ready_then_fails() {
        let mut input = startup_burst();
        input.extend_from_slice(
            b"E\x00\x00\x00\x1aSERROR\x00Msyntax error\x00\x00Z\x00\x00\x00\x05I",
        );
        let mut session = session(input);

        session.startup().unwrap();
        let Error::Database(err) = session.query("SELEC 1").unwrap_err() else {
            panic!("expected a database error");
        };
        assert_eq!(err.message(), Some("syntax error"));
        // the error response was drained through ready-for-query
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn truncated_reply_is_a_framing_error() {
        let mut burst = startup_burst();
        burst.truncate(burst.len() - 1);
        let mut session = session(burst);
        assert!(matches!(session.startup(), Err(Error::Framing(_))));
    }
}
