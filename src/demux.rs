//! Folds a sequence of frames into a sequence of complete messages.

use crate::error::{ProtocolError, WsResult};
use crate::frame::{Frame, Opcode};
use crate::message::{parse_close_payload, ApplicationMessage, ControlMessage, Message};

/// Per connection reassembly state: the opcode and accumulated payload of a
/// fragmented message in flight, if any.
///
/// At most one fragmented message can be in flight at a time; control frames
/// pass through without touching it.
#[derive(Debug, Default)]
pub struct DemuxState {
  partial: Option<(Opcode, Vec<u8>)>,
}

impl DemuxState {
  /// Creates an empty state, as every connection starts out.
  pub fn new() -> Self {
    Self::default()
  }

  /// True while a fragmented message is being assembled.
  pub fn is_fragmented(&self) -> bool {
    self.partial.is_some()
  }
}

/// Feeds one frame through the reassembly state.
///
/// Returns `Ok(Some(message))` when the frame completed a message (control
/// frames always do, a final data frame completes whatever was in flight or
/// itself), `Ok(None)` when the frame only accumulated. Every protocol
/// violation listed on [`ProtocolError`] is fatal: the stream is
/// desynchronized and the connection must be closed.
pub fn demultiplex(state: &mut DemuxState, frame: Frame) -> WsResult<Option<Message>> {
  let opcode = frame.opcode();

  if opcode.is_control() {
    if !frame.fin() {
      return Err(ProtocolError::FragmentedControlFrame.into());
    }

    // Control frames may interleave mid-fragmentation; state stays as is.
    let control = match opcode {
      Opcode::Close => parse_close_payload(frame.payload())?,
      Opcode::Ping => ControlMessage::Ping(frame.into_payload()),
      _ => ControlMessage::Pong(frame.into_payload()),
    };
    return Ok(Some(Message::Control(control)));
  }

  if opcode == Opcode::Continuation {
    let (first_opcode, mut buffer) = match state.partial.take() {
      Some(partial) => partial,
      None => return Err(ProtocolError::UnexpectedContinuation.into()),
    };

    let fin = frame.fin();
    buffer.extend_from_slice(frame.payload());
    if fin {
      return Ok(Some(assemble(first_opcode, buffer)?));
    }

    state.partial = Some((first_opcode, buffer));
    return Ok(None);
  }

  // Fresh text/binary frame.
  if state.partial.is_some() {
    return Err(ProtocolError::DataFrameDuringFragmentation.into());
  }

  if frame.fin() {
    return Ok(Some(assemble(opcode, frame.into_payload())?));
  }

  state.partial = Some((opcode, frame.into_payload()));
  Ok(None)
}

fn assemble(opcode: Opcode, payload: Vec<u8>) -> WsResult<Message> {
  match opcode {
    Opcode::Text => {
      let text = String::from_utf8(payload).map_err(|_| ProtocolError::TextNotUtf8)?;
      Ok(Message::Application(ApplicationMessage::Text(text)))
    }
    Opcode::Binary => Ok(Message::Application(ApplicationMessage::Binary(payload))),
    other => Err(ProtocolError::InvalidOpcode(other as u8).into()),
  }
}
