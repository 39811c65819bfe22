//! Blocking transport over a Unix domain socket or TCP stream.
use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use bytes::BytesMut;

use crate::{
    connection::Config,
    error::{Error, FramingError, Result},
    frame::Message,
    message::FrontendMessage,
};

/// Default receive chunk size for [`Transport::drain_recv`], matching the
/// reference behavior. Production callers should raise it via
/// [`Config::chunk_size`].
pub const DEFAULT_CHUNK_SIZE: usize = 16;

#[derive(Debug)]
enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
    #[cfg(test)]
    Mock(mock::MockStream),
}

macro_rules! dispatch {
    ($me:ident, $stream:pat => $expr:expr) => {
        match $me {
            Stream::Tcp($stream) => $expr,
            #[cfg(unix)]
            Stream::Unix($stream) => $expr,
            #[cfg(test)]
            Stream::Mock($stream) => $expr,
        }
    };
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        dispatch!(self, s => s.read(buf))
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        dispatch!(self, s => s.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        dispatch!(self, s => s.flush())
    }
}

/// Blocking send/receive against one connection.
///
/// The transport exclusively owns the socket for the lifetime of one
/// session; dropping the transport closes it, on every exit path.
#[derive(Debug)]
pub struct Transport {
    stream: Stream,
    chunk_size: usize,
}

impl Transport {
    /// Open the underlying connection.
    ///
    /// An explicit socket path wins; `localhost` connects over the
    /// conventional Unix socket path for the configured port; anything
    /// else is TCP.
    pub fn connect(config: &Config) -> Result<Transport> {
        #[cfg(unix)]
        let stream = match (&config.socket, config.host.as_str()) {
            (Some(path), _) => Stream::Unix(UnixStream::connect(path)?),
            (None, "localhost") => {
                let path = format!("/run/postgresql/.s.PGSQL.{}", config.port);
                Stream::Unix(UnixStream::connect(path)?)
            }
            (None, host) => Stream::Tcp(TcpStream::connect((host, config.port))?),
        };

        #[cfg(not(unix))]
        let stream = Stream::Tcp(TcpStream::connect((config.host.as_str(), config.port))?);

        log::debug!("connected to {}:{}", config.host, config.port);

        Ok(Transport { stream, chunk_size: config.chunk_size })
    }

    /// Frame and send one frontend message.
    pub fn send<F: FrontendMessage>(&mut self, message: F) -> Result<()> {
        let mut buf = BytesMut::new();
        message.encode(&mut buf);
        self.send_all(&buf)
    }

    /// Write the complete byte sequence and flush it.
    pub fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        log::trace!("sent {} bytes", bytes.len());
        Ok(())
    }

    /// Receive exactly one tagged message.
    ///
    /// Reads the fixed five byte header, then exactly the number of body
    /// bytes the length field declares, so it never depends on read timing
    /// the way [`drain_recv`] does.
    ///
    /// [`drain_recv`]: Transport::drain_recv
    pub fn recv_message(&mut self) -> Result<Message> {
        let mut header = [0u8; 5];
        self.stream.read_exact(&mut header)?;

        let tag = header[0];
        let length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if length < 4 {
            return Err(FramingError::Length(length).into());
        }

        let mut body = vec![0u8; length - 4];
        self.stream.read_exact(&mut body).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                Error::from(FramingError::Malformed("stream ended inside a message body"))
            }
            _ => Error::Connection(err),
        })?;

        log::trace!("received {:?}, {} bytes", tag as char, 1 + length);
        Ok(Message::new(Some(tag), body.into()))
    }

    /// Read whatever response bytes are immediately available.
    ///
    /// Keeps reading fixed-size chunks until a read comes back short. This
    /// is a timing heuristic, not a protocol guarantee: a response whose
    /// size is an exact multiple of the chunk size blocks waiting for a
    /// chunk that never arrives, and a slow or fragmented path can cut a
    /// burst short. Session flows use the length-driven
    /// [`recv_message`][1]; this survives for exploratory inspection of a
    /// raw response burst.
    ///
    /// A read timeout surfaces as [`Error::Connection`], never as end of
    /// data.
    ///
    /// [1]: Transport::recv_message
    pub fn drain_recv(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            let n = self.stream.read(&mut chunk)?;
            out.extend_from_slice(&chunk[..n]);
            if n < self.chunk_size {
                break;
            }
        }
        log::trace!("drained {} bytes", out.len());
        Ok(out)
    }
}

#[cfg(test)]
impl Transport {
    pub(crate) fn mock(input: Vec<u8>) -> Transport {
        Transport {
            stream: Stream::Mock(mock::MockStream::new(input)),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Everything the session wrote, as the server would see it.
    pub(crate) fn sent(&self) -> &[u8] {
        match &self.stream {
            Stream::Mock(s) => &s.output,
            _ => panic!("not a mock transport"),
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::frame;

    #[test]
    fn drain_recv_stops_on_a_short_read() {
        let mut transport = Transport::mock((0..20).collect());
        assert_eq!(transport.drain_recv().unwrap(), (0..20).collect::<Vec<u8>>());
    }

    #[test]
    fn drain_recv_of_nothing_is_empty() {
        let mut transport = Transport::mock(Vec::new());
        assert!(transport.drain_recv().unwrap().is_empty());
    }

    #[test]
    fn recv_message_reads_exact_frames() {
        let mut wire = frame::build(Some(b'R'), &[0, 0, 0, 0]).to_vec();
        wire.extend_from_slice(&frame::build(Some(b'Z'), b"I"));

        let mut transport = Transport::mock(wire);

        let first = transport.recv_message().unwrap();
        assert_eq!(first.tag(), Some(b'R'));
        assert_eq!(first.payload(), [0, 0, 0, 0]);

        let second = transport.recv_message().unwrap();
        assert_eq!(second.tag(), Some(b'Z'));
        assert_eq!(second.payload(), b"I");
    }

    #[test]
    fn recv_message_with_truncated_body_is_a_framing_error() {
        // declares a 5 byte body but the stream ends after one
        let mut transport = Transport::mock(b"Z\x00\x00\x00\x09I".to_vec());
        assert!(matches!(
            transport.recv_message(),
            Err(Error::Framing(FramingError::Malformed(_))),
        ));
    }

    #[test]
    fn recv_message_with_implausible_length_is_a_framing_error() {
        let mut transport = Transport::mock(b"Z\x00\x00\x00\x00".to_vec());
        assert!(matches!(
            transport.recv_message(),
            Err(Error::Framing(FramingError::Length(0))),
        ));
    }

    #[test]
    fn send_frames_the_message() {
        let mut transport = Transport::mock(Vec::new());
        transport.send(crate::message::Terminate).unwrap();
        assert_eq!(transport.sent(), b"X\x00\x00\x00\x04");
    }
}
