//! The demultiplexed message types the application consumes.

use crate::error::{ProtocolError, WsResult};

/// One complete logical message, after fragmentation has been undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
  /// Protocol housekeeping traffic: Close, Ping, Pong.
  Control(ControlMessage),
  /// Payload traffic for the application: Text or Binary.
  Application(ApplicationMessage),
}

/// A control message. Never fragmented on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
  /// Orderly shutdown, optionally with a status code and a reason.
  Close(Option<u16>, Option<String>),
  /// Liveness probe carrying an arbitrary payload.
  Ping(Vec<u8>),
  /// Answer to a ping, echoing its payload.
  Pong(Vec<u8>),
}

/// An application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationMessage {
  /// UTF-8 text.
  Text(String),
  /// Raw bytes.
  Binary(Vec<u8>),
}

impl Message {
  /// The application message, if this is one.
  pub fn application(self) -> Option<ApplicationMessage> {
    match self {
      Message::Application(app) => Some(app),
      Message::Control(_) => None,
    }
  }

  /// True for Close, Ping and Pong.
  pub fn is_control(&self) -> bool {
    matches!(self, Message::Control(_))
  }
}

impl ApplicationMessage {
  /// The payload as bytes, regardless of kind.
  pub fn bytes(&self) -> &[u8] {
    match self {
      ApplicationMessage::Text(txt) => txt.as_bytes(),
      ApplicationMessage::Binary(bin) => bin.as_slice(),
    }
  }

  /// The payload as text: directly for Text, via UTF-8 validation for Binary.
  pub fn text(&self) -> Option<&str> {
    match self {
      ApplicationMessage::Text(txt) => Some(txt),
      ApplicationMessage::Binary(bin) => std::str::from_utf8(bin.as_slice()).ok(),
    }
  }
}

/// Packs a close status code and reason into a close frame payload,
/// [RFC 6455 Section 5.5.1](https://datatracker.ietf.org/doc/html/rfc6455#section-5.5.1).
/// A reason without a code gets the 1000 "normal closure" code, since the
/// wire format cannot express a reason alone.
pub(crate) fn close_payload(code: Option<u16>, reason: Option<&str>) -> Vec<u8> {
  let code = match (code, reason) {
    (Some(code), _) => code,
    (None, Some(_)) => 1000,
    (None, None) => return Vec::new(),
  };

  let reason = reason.unwrap_or("");
  let mut payload = Vec::with_capacity(2 + reason.len());
  payload.extend_from_slice(&code.to_be_bytes());
  payload.extend_from_slice(reason.as_bytes());
  payload
}

/// Parses a close frame payload back into code and reason. An empty payload
/// carries neither; a single byte payload and a non UTF-8 reason are both
/// protocol errors.
pub(crate) fn parse_close_payload(payload: &[u8]) -> WsResult<ControlMessage> {
  match payload {
    [] => Ok(ControlMessage::Close(None, None)),
    [_] => Err(ProtocolError::MalformedCloseFrame.into()),
    [hi, lo, reason @ ..] => {
      let code = u16::from_be_bytes([*hi, *lo]);
      let reason = if reason.is_empty() {
        None
      } else {
        Some(
          std::str::from_utf8(reason)
            .map_err(|_| ProtocolError::MalformedCloseFrame)?
            .to_string(),
        )
      };
      Ok(ControlMessage::Close(Some(code), reason))
    }
  }
}
