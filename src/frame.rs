//! Bit level WebSocket frame codec, [RFC 6455 Section 5](https://datatracker.ietf.org/doc/html/rfc6455#section-5).

use crate::error::{ProtocolError, WsError, WsResult};
use crate::message::close_payload;
use crate::stream::ConnectionStreamRead;

use std::convert::TryFrom;
use std::io::ErrorKind;

/// One wire frame.
/// Follows [Section 5.2 of RFC 6455](https://datatracker.ietf.org/doc/html/rfc6455#section-5.2).
///
/// The payload is stored unmasked; `mask` records the key the frame was (or
/// will be) masked with on the wire. Which direction masks is not decided
/// here: the connection applies its endpoint role before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub(crate) fin: bool,
  pub(crate) rsv: [bool; 3],
  pub(crate) opcode: Opcode,
  pub(crate) mask: Option<[u8; 4]>,
  pub(crate) payload: Vec<u8>,
}

/// The 4 bit tag identifying a frame's purpose.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
  /// Another fragment of the message in flight.
  Continuation = 0x0,
  /// First (or only) frame of a text message.
  Text = 0x1,
  /// First (or only) frame of a binary message.
  Binary = 0x2,
  /// Connection close.
  Close = 0x8,
  /// Liveness probe.
  Ping = 0x9,
  /// Answer to a ping.
  Pong = 0xA,
}

impl Opcode {
  /// True for Close, Ping and Pong.
  pub fn is_control(&self) -> bool {
    matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
  }

  /// True for Text and Binary.
  pub fn is_data(&self) -> bool {
    matches!(self, Opcode::Text | Opcode::Binary)
  }
}

impl TryFrom<u8> for Opcode {
  type Error = ProtocolError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0x0 => Ok(Self::Continuation),
      0x1 => Ok(Self::Text),
      0x2 => Ok(Self::Binary),
      0x8 => Ok(Self::Close),
      0x9 => Ok(Self::Ping),
      0xA => Ok(Self::Pong),
      other => Err(ProtocolError::InvalidOpcode(other)),
    }
  }
}

impl Frame {
  /// Creates an unmasked final frame.
  pub fn new(opcode: Opcode, payload: Vec<u8>) -> Self {
    Self { fin: true, rsv: [false; 3], opcode, mask: None, payload }
  }

  /// Creates one fragment of a fragmented message. The first fragment
  /// carries the data opcode, the rest are continuations; only the last has
  /// `fin` set.
  pub fn fragment(opcode: Opcode, payload: Vec<u8>, fin: bool) -> Self {
    Self { fin, rsv: [false; 3], opcode, mask: None, payload }
  }

  /// Creates a close frame, packing the status code and reason into the
  /// payload.
  pub fn close(code: Option<u16>, reason: Option<&str>) -> Self {
    Self::new(Opcode::Close, close_payload(code, reason))
  }

  /// Creates a ping frame.
  pub fn ping(payload: Vec<u8>) -> Self {
    Self::new(Opcode::Ping, payload)
  }

  /// Creates a pong frame.
  pub fn pong(payload: Vec<u8>) -> Self {
    Self::new(Opcode::Pong, payload)
  }

  /// Sets the masking key the frame will be encoded with.
  pub fn with_mask(mut self, key: [u8; 4]) -> Self {
    self.mask = Some(key);
    self
  }

  /// Draws a fresh masking key from the operating system's random source.
  /// Predictable keys would let an attacker craft payloads that appear as
  /// chosen plaintext on the wire.
  pub fn random_mask_key() -> WsResult<[u8; 4]> {
    let mut key = [0u8; 4];
    getrandom::fill(&mut key)
      .map_err(|e| WsError::new_io(ErrorKind::Other, format!("mask key generation: {e}")))?;
    Ok(key)
  }

  /// True if this is the last fragment of its message.
  pub fn fin(&self) -> bool {
    self.fin
  }

  /// The frame's opcode.
  pub fn opcode(&self) -> Opcode {
    self.opcode
  }

  /// The masking key, if any.
  pub fn mask(&self) -> Option<[u8; 4]> {
    self.mask
  }

  /// The unmasked payload.
  pub fn payload(&self) -> &[u8] {
    &self.payload
  }

  /// Consumes the frame, returning the unmasked payload.
  pub fn into_payload(self) -> Vec<u8> {
    self.payload
  }

  /// Reads one frame from the stream, blocking until it is complete.
  ///
  /// Returns `Ok(None)` if the stream was cleanly at EOF before the first
  /// header byte; EOF anywhere later is an I/O error. Reserved bits, unknown
  /// opcodes, non-minimal length encodings, lengths of 2^63 or more and
  /// oversized control payloads are all protocol errors.
  pub fn from_stream(stream: &dyn ConnectionStreamRead) -> WsResult<Option<Self>> {
    let mut header: [u8; 2] = [0; 2];
    if stream.read(&mut header[..1])? == 0 {
      return Ok(None);
    }
    stream.read_exact(&mut header[1..])?;

    let fin = header[0] & 0x80 != 0;
    if header[0] & 0x70 != 0 {
      return Err(ProtocolError::NonZeroReservedBits.into());
    }
    let opcode = Opcode::try_from(header[0] & 0xF)?;
    let masked = header[1] & 0x80 != 0;

    let mut length: u64 = (header[1] & 0x7F) as u64;
    if length == 126 {
      let mut buf: [u8; 2] = [0; 2];
      stream.read_exact(&mut buf)?;
      length = u16::from_be_bytes(buf) as u64;
      if length < 126 {
        return Err(ProtocolError::NonMinimalLengthEncoding.into());
      }
    } else if length == 127 {
      let mut buf: [u8; 8] = [0; 8];
      stream.read_exact(&mut buf)?;
      length = u64::from_be_bytes(buf);
      if length & 0x8000_0000_0000_0000 != 0 {
        return Err(ProtocolError::PayloadTooLarge(length).into());
      }
      if length < 65536 {
        return Err(ProtocolError::NonMinimalLengthEncoding.into());
      }
    }

    if opcode.is_control() && length > 125 {
      return Err(ProtocolError::ControlFrameTooLarge(length as usize).into());
    }

    let mask = if masked {
      let mut key: [u8; 4] = [0; 4];
      stream.read_exact(&mut key)?;
      Some(key)
    } else {
      None
    };

    let length = usize::try_from(length).map_err(|_| ProtocolError::PayloadTooLarge(length))?;
    //TODO make the maximum payload length configurable, a hostile peer can announce gigabytes
    let mut payload: Vec<u8> = vec![0; length];
    stream.read_exact(&mut payload)?;

    if let Some(key) = mask {
      for (byte, k) in payload.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
      }
    }

    Ok(Some(Self { fin, rsv: [false; 3], opcode, mask, payload }))
  }

  /// Encodes the frame, masking the payload if a key is set. The length
  /// field always uses the minimal form.
  pub fn to_bytes(&self) -> Vec<u8> {
    let length = self.payload.len() as u64;
    let mut buf: Vec<u8> = Vec::with_capacity(self.payload.len() + 14);

    buf.push(
      (self.fin as u8) << 7
        | (self.rsv[0] as u8) << 6
        | (self.rsv[1] as u8) << 5
        | (self.rsv[2] as u8) << 4
        | self.opcode as u8,
    );

    let mask_bit: u8 = if self.mask.is_some() { 0x80 } else { 0 };
    if length < 126 {
      buf.push(mask_bit | length as u8);
    } else if length < 65536 {
      buf.push(mask_bit | 126);
      buf.extend_from_slice(&(length as u16).to_be_bytes());
    } else {
      buf.push(mask_bit | 127);
      buf.extend_from_slice(&length.to_be_bytes());
    }

    match self.mask {
      Some(key) => {
        buf.extend_from_slice(&key);
        buf.extend(self.payload.iter().zip(key.iter().cycle()).map(|(byte, k)| byte ^ k));
      }
      None => buf.extend_from_slice(&self.payload),
    }

    buf
  }
}

impl From<Frame> for Vec<u8> {
  fn from(frame: Frame) -> Self {
    frame.to_bytes()
  }
}

impl AsRef<[u8]> for Frame {
  fn as_ref(&self) -> &[u8] {
    &self.payload
  }
}

#[cfg(test)]
mod test {
  #![allow(clippy::unusual_byte_groupings)]

  use crate::error::{ProtocolError, WsError};
  use crate::frame::{Frame, Opcode};
  use crate::stream::{ConnectionStream, IntoConnectionStream};
  use std::io::{Cursor, Read, Write};

  fn stream_of(data: Vec<u8>) -> Box<dyn ConnectionStream> {
    (Box::new(Cursor::new(data)) as Box<dyn Read + Send>, Box::new(std::io::sink()) as Box<dyn Write + Send>)
      .into_connection_stream()
  }

  fn decode(data: Vec<u8>) -> Result<Option<Frame>, WsError> {
    Frame::from_stream(stream_of(data).as_stream_read())
  }

  fn protocol_error(result: Result<Option<Frame>, WsError>) -> ProtocolError {
    match result {
      Err(WsError::Protocol(e)) => e,
      other => panic!("expected a protocol error, got {other:?}"),
    }
  }

  #[rustfmt::skip]
  const MASKED_FRAGMENT_BYTES: [u8; 12] = [
    0b0000_0001, // not fin, opcode text
    0b1_0000110, // mask, payload length 6
    0x69, 0x69, 0x69, 0x69, // masking key 0x69696969
    1, 12, 5, 5, 6, 73 // masked payload "hello "
  ];

  #[rustfmt::skip]
  const UNMASKED_BYTES: [u8; 13] = [
    0b1000_0001, // fin, opcode text
    0b0_0001011, // not mask, payload length 11
    b'h', b'e', b'l', b'l', b'o', b' ', b'w', b'o', b'r', b'l', b'd' // unmasked payload "hello world"
  ];

  #[rustfmt::skip]
  const MEDIUM_FRAME_BYTES: [u8; 8] = [
    0b1000_0001, // fin, opcode text
    0b1_1111110, // mask, payload length 126 (extended payload length 16 bit)
    0x01, 0x00, // extended payload length of 256
    0x69, 0x69, 0x69, 0x69, // masking key 0x69696969
  ];

  #[rustfmt::skip]
  const LONG_FRAME_BYTES: [u8; 14] = [
    0b1000_0001, // fin, opcode text
    0b1_1111111, // mask, payload length 127 (extended payload length 64 bit)
    0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, // extended payload length of 65536
    0x69, 0x69, 0x69, 0x69, // masking key 0x69696969
  ];

  #[test]
  fn test_masked_fragment() {
    let frame = decode(MASKED_FRAGMENT_BYTES.to_vec()).unwrap().unwrap();

    let expected = Frame {
      fin: false,
      rsv: [false; 3],
      opcode: Opcode::Text,
      mask: Some([0x69; 4]),
      payload: b"hello ".to_vec(),
    };

    assert_eq!(frame, expected);
  }

  #[test]
  fn test_unmasked_frame() {
    let frame = decode(UNMASKED_BYTES.to_vec()).unwrap().unwrap();

    assert_eq!(frame, Frame::new(Opcode::Text, b"hello world".to_vec()));
  }

  #[test]
  fn test_medium_frame() {
    let mut bytes = Vec::with_capacity(264);
    bytes.extend(MEDIUM_FRAME_BYTES);
    bytes.extend(vec![b'x' ^ 0x69; 256]);

    let frame = decode(bytes).unwrap().unwrap();

    assert_eq!(frame.opcode(), Opcode::Text);
    assert_eq!(frame.payload(), vec![b'x'; 256].as_slice());
  }

  #[test]
  fn test_long_frame() {
    let mut bytes = Vec::with_capacity(65550);
    bytes.extend(LONG_FRAME_BYTES);
    bytes.extend(vec![b'x' ^ 0x69; 65536]);

    let frame = decode(bytes).unwrap().unwrap();

    assert_eq!(frame.opcode(), Opcode::Text);
    assert_eq!(frame.payload().len(), 65536);
  }

  #[test]
  fn test_encode_unmasked() {
    let frame = Frame::new(Opcode::Text, b"hello world".to_vec());

    assert_eq!(frame.to_bytes(), UNMASKED_BYTES.to_vec());
  }

  #[test]
  fn test_clean_eof_is_none() {
    assert!(decode(Vec::new()).unwrap().is_none());
  }

  #[test]
  fn test_round_trip_all_length_classes() {
    for len in [0usize, 1, 125, 126, 65535, 65536] {
      for mask in [None, Some([0xDE, 0xAD, 0xBE, 0xEF])] {
        for opcode in [Opcode::Text, Opcode::Binary] {
          let frame = Frame { fin: true, rsv: [false; 3], opcode, mask, payload: vec![0xA5; len] };
          let decoded = decode(frame.to_bytes()).unwrap().unwrap();
          assert_eq!(decoded, frame, "len {len} mask {mask:?}");
        }
      }
    }
  }

  #[test]
  fn test_encode_minimal_length_form() {
    // 7 bit form up to 125, 16 bit form up to 65535, 64 bit form beyond
    assert_eq!(Frame::new(Opcode::Binary, vec![0; 125]).to_bytes()[1], 125);
    assert_eq!(Frame::new(Opcode::Binary, vec![0; 126]).to_bytes()[1], 126);
    assert_eq!(Frame::new(Opcode::Binary, vec![0; 65535]).to_bytes()[1], 126);
    assert_eq!(Frame::new(Opcode::Binary, vec![0; 65536]).to_bytes()[1], 127);
  }

  #[test]
  fn test_decode_rejects_non_minimal_16bit() {
    // length 5 wrapped in the 126 form
    let mut bytes = vec![0b1000_0010, 126, 0x00, 0x05];
    bytes.extend_from_slice(&[1, 2, 3, 4, 5]);

    assert_eq!(protocol_error(decode(bytes)), ProtocolError::NonMinimalLengthEncoding);
  }

  #[test]
  fn test_decode_rejects_non_minimal_64bit() {
    // length 256 wrapped in the 127 form
    let mut bytes = vec![0b1000_0010, 127, 0, 0, 0, 0, 0, 0, 0x01, 0x00];
    bytes.extend_from_slice(&[0; 256]);

    assert_eq!(protocol_error(decode(bytes)), ProtocolError::NonMinimalLengthEncoding);
  }

  #[test]
  fn test_decode_rejects_length_top_bit() {
    let bytes = vec![0b1000_0010, 127, 0x80, 0, 0, 0, 0, 0, 0, 0];

    assert!(matches!(protocol_error(decode(bytes)), ProtocolError::PayloadTooLarge(_)));
  }

  #[test]
  fn test_decode_rejects_reserved_bits() {
    let bytes = vec![0b1100_0001, 0, 0];

    assert_eq!(protocol_error(decode(bytes)), ProtocolError::NonZeroReservedBits);
  }

  #[test]
  fn test_decode_rejects_reserved_opcode() {
    let bytes = vec![0b1000_0011, 0];

    assert_eq!(protocol_error(decode(bytes)), ProtocolError::InvalidOpcode(0x3));
  }

  #[test]
  fn test_decode_rejects_oversized_control_frame() {
    let mut bytes = vec![0b1000_1001, 126, 0x00, 126];
    bytes.extend_from_slice(&[0; 126]);

    assert_eq!(protocol_error(decode(bytes)), ProtocolError::ControlFrameTooLarge(126));
  }

  #[test]
  fn test_close_frame_payload() {
    let frame = Frame::close(Some(1000), Some("bye"));

    assert_eq!(frame.opcode(), Opcode::Close);
    assert_eq!(frame.payload(), [0x03, 0xE8, b'b', b'y', b'e']);
  }
}
