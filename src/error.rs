//! Error types for the protocol engine.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::io::ErrorKind;

/// Result type used throughout the crate.
pub type WsResult<T> = Result<T, WsError>;

/// A violation of the WebSocket wire protocol.
///
/// All of these are fatal for the connection: once one is observed the byte
/// stream has no safe resynchronization point and must be closed.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ProtocolError {
  /// The 4 bit opcode was a reserved value.
  InvalidOpcode(u8),
  /// One of the RSV1-3 header bits was set without a negotiated extension.
  NonZeroReservedBits,
  /// A 16 or 64 bit extended length was used for a payload that fits a shorter form.
  NonMinimalLengthEncoding,
  /// The 64 bit extended length had its most significant bit set.
  PayloadTooLarge(u64),
  /// A control frame carried more than 125 payload bytes.
  ControlFrameTooLarge(usize),
  /// A control frame had its fin bit clear.
  FragmentedControlFrame,
  /// A continuation frame arrived with no fragmented message in flight.
  UnexpectedContinuation,
  /// A fresh text/binary frame arrived while a fragmented message was in flight.
  DataFrameDuringFragmentation,
  /// A text message payload was not valid UTF-8.
  TextNotUtf8,
  /// A close frame payload was 1 byte long or carried a non UTF-8 reason.
  MalformedCloseFrame,
  /// The stream ended while a fragmented message was still being assembled.
  ClosedDuringFragmentedMessage,
  /// The HTTP request head could not be parsed.
  MalformedRequestHead(String),
}

impl Display for ProtocolError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ProtocolError::InvalidOpcode(op) => write!(f, "invalid opcode 0x{op:X}"),
      ProtocolError::NonZeroReservedBits => write!(f, "non zero reserved bits in frame header"),
      ProtocolError::NonMinimalLengthEncoding => write!(f, "non minimal payload length encoding"),
      ProtocolError::PayloadTooLarge(n) => write!(f, "payload length {n} exceeds 2^63-1"),
      ProtocolError::ControlFrameTooLarge(n) => {
        write!(f, "control frame payload of {n} bytes exceeds 125")
      }
      ProtocolError::FragmentedControlFrame => write!(f, "fragmented control frame"),
      ProtocolError::UnexpectedContinuation => {
        write!(f, "continuation frame without a fragmented message in flight")
      }
      ProtocolError::DataFrameDuringFragmentation => {
        write!(f, "data frame while a fragmented message is in flight")
      }
      ProtocolError::TextNotUtf8 => write!(f, "text message is not valid utf-8"),
      ProtocolError::MalformedCloseFrame => write!(f, "malformed close frame payload"),
      ProtocolError::ClosedDuringFragmentedMessage => {
        write!(f, "stream ended during a fragmented message")
      }
      ProtocolError::MalformedRequestHead(reason) => {
        write!(f, "malformed request head: {reason}")
      }
    }
  }
}

impl Error for ProtocolError {}

/// Why an HTTP upgrade request failed WebSocket negotiation.
///
/// Returned as a value, never panicked; the caller decides whether to answer
/// with an HTTP error response before dropping the socket.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum HandshakeError {
  /// The client requested a protocol version this engine does not speak.
  /// Carries the versions it does.
  NotSupported(Vec<String>),
  /// A required header was missing or had an invalid value.
  MalformedRequest(String),
  /// Catch-all for everything else.
  Other(String),
}

impl Display for HandshakeError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      HandshakeError::NotSupported(versions) => {
        write!(f, "unsupported websocket version, supported: {}", versions.join(", "))
      }
      HandshakeError::MalformedRequest(reason) => write!(f, "malformed upgrade request: {reason}"),
      HandshakeError::Other(reason) => write!(f, "handshake failed: {reason}"),
    }
  }
}

impl Error for HandshakeError {}

/// Top level error of the engine.
#[derive(Debug)]
#[non_exhaustive]
pub enum WsError {
  /// Failure of the underlying byte stream.
  IO(io::Error),
  /// Fatal wire protocol violation.
  Protocol(ProtocolError),
  /// Upgrade negotiation failure.
  Handshake(HandshakeError),
  /// A send was attempted after the connection was closed.
  ConnectionClosed,
  /// Anything else.
  Other(Box<dyn Error + Send + Sync>),
}

impl WsError {
  /// Creates an IO error variant from an error kind and message.
  pub fn new_io<E: Into<Box<dyn Error + Send + Sync>>>(kind: ErrorKind, message: E) -> WsError {
    WsError::IO(io::Error::new(kind, message))
  }

  /// Maps the error to the closest `io::ErrorKind`.
  pub fn kind(&self) -> ErrorKind {
    match self {
      WsError::IO(io) => io.kind(),
      WsError::Protocol(_) => ErrorKind::InvalidData,
      WsError::Handshake(_) => ErrorKind::InvalidData,
      WsError::ConnectionClosed => ErrorKind::NotConnected,
      WsError::Other(_) => ErrorKind::Other,
    }
  }

  /// True if this error is a fatal protocol violation.
  pub fn is_protocol(&self) -> bool {
    matches!(self, WsError::Protocol(_))
  }
}

impl Display for WsError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      WsError::IO(err) => Display::fmt(err, f),
      WsError::Protocol(err) => Display::fmt(err, f),
      WsError::Handshake(err) => Display::fmt(err, f),
      WsError::ConnectionClosed => write!(f, "connection closed"),
      WsError::Other(err) => Display::fmt(err, f),
    }
  }
}

impl Error for WsError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      WsError::IO(err) => Some(err),
      WsError::Protocol(err) => Some(err),
      WsError::Handshake(err) => Some(err),
      WsError::ConnectionClosed => None,
      WsError::Other(err) => Some(err.as_ref()),
    }
  }
}

impl From<io::Error> for WsError {
  fn from(value: io::Error) -> Self {
    WsError::IO(value)
  }
}

impl From<ProtocolError> for WsError {
  fn from(value: ProtocolError) -> Self {
    WsError::Protocol(value)
  }
}

impl From<HandshakeError> for WsError {
  fn from(value: HandshakeError) -> Self {
    WsError::Handshake(value)
  }
}

impl From<WsError> for io::Error {
  fn from(value: WsError) -> Self {
    match value {
      WsError::IO(io) => io,
      err => io::Error::new(err.kind(), err.to_string()),
    }
  }
}
