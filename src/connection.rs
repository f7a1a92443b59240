//! The connection context: one duplex stream, one reassembly state, one
//! serialized write path.
//!
//! Exactly one logical reader exists per connection, enforced by `&mut self`
//! on the receive methods. Sends may come from the receive loop and from any
//! number of [`Sender`] clones concurrently; every writer stages the full
//! encoded unit first and then hands it to the stream's mutex guarded
//! `write_all`, so two frames can never interleave their bytes on the wire.

use crate::demux::{demultiplex, DemuxState};
use crate::error::{ProtocolError, WsError, WsResult};
use crate::frame::Frame;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::message::{ApplicationMessage, ControlMessage, Message};
use crate::stream::{
  ConnectionStream, ConnectionStreamRead, ConnectionStreamWrite, IntoConnectionStream,
};
use crate::trace_log;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;

/// A unit that can be read off the wire: a frame, an upgrade request.
pub trait Decode: Sized {
  /// Blocking read of exactly one unit. `Ok(None)` on clean stream end
  /// before the first byte; malformed bytes are an error.
  fn decode(stream: &dyn ConnectionStreamRead) -> WsResult<Option<Self>>;
}

/// A unit that can be written to the wire: a frame, a handshake response.
pub trait Encode {
  /// Serializes the unit into `buf`. Nothing is written to any stream here.
  fn encode_into(&self, buf: &mut Vec<u8>) -> WsResult<()>;
}

impl Decode for Frame {
  fn decode(stream: &dyn ConnectionStreamRead) -> WsResult<Option<Self>> {
    Frame::from_stream(stream)
  }
}

impl Decode for Request {
  fn decode(stream: &dyn ConnectionStreamRead) -> WsResult<Option<Self>> {
    Request::from_stream(stream)
  }
}

impl Encode for Frame {
  fn encode_into(&self, buf: &mut Vec<u8>) -> WsResult<()> {
    buf.extend_from_slice(&self.to_bytes());
    Ok(())
  }
}

impl Encode for Response {
  fn encode_into(&self, buf: &mut Vec<u8>) -> WsResult<()> {
    buf.extend_from_slice(&self.to_bytes());
    Ok(())
  }
}

/// Which side of the connection this endpoint is. Decides the masking rule:
/// clients mask every frame they send, servers mask nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
  /// The accepting side.
  Server,
  /// The initiating side.
  Client,
}

/// One WebSocket connection.
///
/// Owns the stream and the [`DemuxState`]; dropping it drops the engine's
/// interest in the stream. Created fresh per accepted socket, before or
/// after the handshake (the handshake itself runs through
/// [`receive`](Connection::receive) and [`send`](Connection::send) too).
#[derive(Debug)]
pub struct Connection {
  stream: Box<dyn ConnectionStream>,
  state: DemuxState,
  endpoint: Endpoint,
  closed: Arc<AtomicBool>,
}

impl Connection {
  /// Creates a connection with the given role.
  pub fn new(stream: impl IntoConnectionStream, endpoint: Endpoint) -> Self {
    Self {
      stream: stream.into_connection_stream(),
      state: DemuxState::new(),
      endpoint,
      closed: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Creates a server side connection.
  pub fn server(stream: impl IntoConnectionStream) -> Self {
    Self::new(stream, Endpoint::Server)
  }

  /// Creates a client side connection.
  pub fn client(stream: impl IntoConnectionStream) -> Self {
    Self::new(stream, Endpoint::Client)
  }

  /// The connection's role.
  pub fn endpoint(&self) -> Endpoint {
    self.endpoint
  }

  /// True once a Close was sent or received, or a fatal error occurred.
  pub fn is_closed(&self) -> bool {
    self.closed.load(SeqCst)
  }

  /// Address of the remote peer, if the transport has one.
  pub fn peer_addr(&self) -> WsResult<String> {
    Ok(self.stream.peer_addr()?)
  }

  /// Blocking read of exactly one decodable unit.
  ///
  /// `&mut self` keeps this the connection's single reader. Returns
  /// `Ok(None)` on clean stream end.
  pub fn receive<T: Decode>(&mut self) -> WsResult<Option<T>> {
    T::decode(self.stream.as_stream_read())
  }

  /// Serializes `value` and writes it to the stream in one atomic write.
  /// Fails with [`WsError::ConnectionClosed`] once the connection is closed.
  pub fn send<T: Encode>(&self, value: &T) -> WsResult<()> {
    if self.is_closed() {
      return Err(WsError::ConnectionClosed);
    }
    write_encoded(self.stream.as_stream_write(), value)
  }

  /// Sends a frame, first applying the role's masking rule: a fresh random
  /// key per frame for clients, no mask for servers.
  pub fn send_frame(&self, frame: Frame) -> WsResult<()> {
    if self.is_closed() {
      return Err(WsError::ConnectionClosed);
    }
    self.send_frame_raw(frame)
  }

  /// Sends a Close frame and marks the connection closed. Errors if it
  /// already was.
  pub fn close(&self, code: Option<u16>, reason: Option<&str>) -> WsResult<()> {
    if self.closed.swap(true, SeqCst) {
      return Err(WsError::ConnectionClosed);
    }
    trace_log!("gannet: sending close, code {:?}", code);
    self.send_frame_raw(Frame::close(code, reason))
  }

  /// Creates a [`Sender`] over this connection's write path. Clonable and
  /// shareable across threads; all clones funnel through the same write
  /// serialization point as [`send`](Connection::send).
  pub fn sender(&self) -> Sender {
    Sender {
      stream: self.stream.new_ref_stream_write(),
      closed: Arc::clone(&self.closed),
      endpoint: self.endpoint,
    }
  }

  /// Receives frames until they assemble into one complete message.
  ///
  /// Returns `Ok(None)` on clean stream end, or once the connection is
  /// closed. Stream end in the middle of a fragmented message is a protocol
  /// error, as is every other violation surfaced by the demultiplexer.
  pub fn receive_message(&mut self) -> WsResult<Option<Message>> {
    if self.is_closed() {
      return Ok(None);
    }

    loop {
      let frame = match self.receive::<Frame>()? {
        Some(frame) => frame,
        None => {
          if self.state.is_fragmented() {
            self.closed.store(true, SeqCst);
            return Err(ProtocolError::ClosedDuringFragmentedMessage.into());
          }
          return Ok(None);
        }
      };

      if let Some(message) = demultiplex(&mut self.state, frame)? {
        return Ok(Some(message));
      }
    }
  }

  /// Receives the next application message, answering protocol traffic
  /// itself: Ping is answered with a Pong carrying the identical payload,
  /// Pong is discarded, Close ends the loop with `Ok(None)` after the close
  /// was echoed back.
  ///
  /// On a protocol violation a best-effort Close (1002) is sent before the
  /// error is returned, and the connection is marked closed.
  pub fn receive_application_message(&mut self) -> WsResult<Option<ApplicationMessage>> {
    loop {
      match self.receive_message() {
        Ok(None) => return Ok(None),
        Ok(Some(Message::Application(message))) => return Ok(Some(message)),
        Ok(Some(Message::Control(ControlMessage::Ping(payload)))) => {
          trace_log!("gannet: answering ping, {} payload bytes", payload.len());
          self.send_frame(Frame::pong(payload))?;
        }
        Ok(Some(Message::Control(ControlMessage::Pong(_)))) => {}
        Ok(Some(Message::Control(ControlMessage::Close(code, reason)))) => {
          trace_log!("gannet: peer sent close, code {:?}", code);
          if !self.closed.swap(true, SeqCst) {
            // Echo so the peer can complete its closing handshake.
            self.send_frame_raw(Frame::close(code, reason.as_deref())).ok();
          }
          return Ok(None);
        }
        Err(err) => {
          if err.is_protocol() && !self.closed.swap(true, SeqCst) {
            self.send_frame_raw(Frame::close(Some(1002), None)).ok();
          }
          return Err(err);
        }
      }
    }
  }

  /// Frame send without the closed check, used for the close exchange
  /// itself.
  fn send_frame_raw(&self, frame: Frame) -> WsResult<()> {
    let frame = apply_mask_rule(self.endpoint, frame)?;
    write_encoded(self.stream.as_stream_write(), &frame)
  }
}

/// A clonable handle to one connection's outbound path.
///
/// Holds a reference to the write half only: it never reads and never
/// touches the reassembly state, so any number of threads may send through
/// it while the receive loop runs. It stays valid for the connection's
/// lifetime and fails with [`WsError::ConnectionClosed`] afterwards.
#[derive(Debug)]
pub struct Sender {
  stream: Box<dyn ConnectionStreamWrite>,
  closed: Arc<AtomicBool>,
  endpoint: Endpoint,
}

impl Clone for Sender {
  fn clone(&self) -> Self {
    Self {
      stream: self.stream.new_ref_stream_write(),
      closed: Arc::clone(&self.closed),
      endpoint: self.endpoint,
    }
  }
}

impl Sender {
  /// True once the connection is closed.
  pub fn is_closed(&self) -> bool {
    self.closed.load(SeqCst)
  }

  /// Serializes `value` and writes it in one atomic write.
  pub fn send<T: Encode>(&self, value: &T) -> WsResult<()> {
    if self.is_closed() {
      return Err(WsError::ConnectionClosed);
    }
    write_encoded(self.stream.as_ref(), value)
  }

  /// Sends a frame under the connection's masking rule.
  pub fn send_frame(&self, frame: Frame) -> WsResult<()> {
    self.send(&apply_mask_rule(self.endpoint, frame)?)
  }

  /// Sends a ping.
  pub fn ping(&self, payload: Vec<u8>) -> WsResult<()> {
    self.send_frame(Frame::ping(payload))
  }

  /// Sends a pong.
  pub fn pong(&self, payload: Vec<u8>) -> WsResult<()> {
    self.send_frame(Frame::pong(payload))
  }

  /// Sends a Close frame and marks the connection closed. Errors if it
  /// already was.
  pub fn close(&self, code: Option<u16>, reason: Option<&str>) -> WsResult<()> {
    if self.closed.swap(true, SeqCst) {
      return Err(WsError::ConnectionClosed);
    }
    let frame = apply_mask_rule(self.endpoint, Frame::close(code, reason))?;
    write_encoded(self.stream.as_ref(), &frame)
  }
}

/// Servers must not mask what they send, clients must mask everything.
fn apply_mask_rule(endpoint: Endpoint, mut frame: Frame) -> WsResult<Frame> {
  match endpoint {
    Endpoint::Server => {
      frame.mask = None;
      Ok(frame)
    }
    Endpoint::Client => match frame.mask {
      Some(_) => Ok(frame),
      None => Ok(frame.with_mask(Frame::random_mask_key()?)),
    },
  }
}

/// Stages the full encoded unit, then writes it through the stream's write
/// mutex in a single `write_all`.
fn write_encoded(stream: &dyn ConnectionStreamWrite, value: &impl Encode) -> WsResult<()> {
  let mut buf: Vec<u8> = Vec::new();
  value.encode_into(&mut buf)?;
  stream.write_all(&buf)?;
  stream.flush()?;
  Ok(())
}
