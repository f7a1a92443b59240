use crate::mock_stream::MockStream;
use gannet::{
  ApplicationMessage, Connection, ControlMessage, Frame, Message, Opcode, ProtocolError,
  WsError,
};
use std::thread;


/// Decodes every frame out of a captured byte stream.
fn decode_frames(bytes: Vec<u8>) -> Vec<Frame> {
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());
  let mut frames = Vec::new();
  while let Some(frame) = con.receive::<Frame>().expect("captured stream is well formed") {
    frames.push(frame);
  }
  frames
}

fn wire(frames: &[Frame]) -> Vec<u8> {
  frames.iter().flat_map(|f| f.to_bytes()).collect()
}

#[test]
fn receive_message_reassembles_wire_fragments() {
  let bytes = wire(&[
    Frame::fragment(Opcode::Text, b"hello ".to_vec(), false),
    Frame::fragment(Opcode::Continuation, b"world".to_vec(), true),
  ]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  let message = con.receive_message().unwrap();
  assert_eq!(
    message,
    Some(Message::Application(ApplicationMessage::Text("hello world".to_string())))
  );

  // clean end of stream afterwards
  assert_eq!(con.receive_message().unwrap(), None);
}

#[test]
fn receive_message_accepts_masked_frames() {
  let bytes = wire(&[Frame::new(Opcode::Binary, b"data".to_vec()).with_mask([7, 7, 7, 7])]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  let message = con.receive_message().unwrap();
  assert_eq!(
    message,
    Some(Message::Application(ApplicationMessage::Binary(b"data".to_vec())))
  );
}

#[test]
fn auto_pong_echoes_the_ping_payload() {
  let bytes = wire(&[Frame::ping(b"hi".to_vec()), Frame::close(None, None)]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  // The ping is answered internally, the close ends the loop.
  assert_eq!(con.receive_application_message().unwrap(), None);
  assert!(con.is_closed());

  let written = decode_frames(stream.copy_written_data());
  assert_eq!(written.len(), 2, "expected exactly one pong and one close echo");
  assert_eq!(written[0].opcode(), Opcode::Pong);
  assert_eq!(written[0].payload(), b"hi");
  assert_eq!(written[1].opcode(), Opcode::Close);
}

#[test]
fn pongs_are_discarded() {
  let bytes = wire(&[
    Frame::pong(b"late".to_vec()),
    Frame::new(Opcode::Text, b"payload".to_vec()),
  ]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  let message = con.receive_application_message().unwrap();
  assert_eq!(message, Some(ApplicationMessage::Text("payload".to_string())));
}

#[test]
fn control_messages_surface_through_receive_message() {
  let bytes = wire(&[Frame::ping(b"raw".to_vec())]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  // The frame level API hands control traffic to the caller unanswered.
  let message = con.receive_message().unwrap();
  assert_eq!(message, Some(Message::Control(ControlMessage::Ping(b"raw".to_vec()))));
  assert!(stream.copy_written_data().is_empty());
}

#[test]
fn receive_after_close_is_none() {
  let bytes = wire(&[Frame::close(Some(1000), None), Frame::ping(Vec::new())]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  assert_eq!(con.receive_application_message().unwrap(), None);
  // The frame after the close is never read.
  assert_eq!(con.receive_message().unwrap(), None);
}

#[test]
fn protocol_violation_answers_with_close_1002() {
  let bytes = wire(&[Frame::fragment(Opcode::Continuation, b"orphan".to_vec(), true)]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  match con.receive_application_message() {
    Err(WsError::Protocol(ProtocolError::UnexpectedContinuation)) => {}
    other => panic!("expected UnexpectedContinuation, got {other:?}"),
  }
  assert!(con.is_closed());

  let written = decode_frames(stream.copy_written_data());
  assert_eq!(written.len(), 1);
  assert_eq!(written[0].opcode(), Opcode::Close);
  assert_eq!(written[0].payload(), [0x03, 0xEA]); // 1002
}

#[test]
fn eof_during_fragmented_message_is_fatal() {
  let bytes = wire(&[Frame::fragment(Opcode::Text, b"never finished".to_vec(), false)]);
  let stream = MockStream::with_data(bytes);
  let mut con = Connection::server(stream.to_stream());

  match con.receive_message() {
    Err(WsError::Protocol(ProtocolError::ClosedDuringFragmentedMessage)) => {}
    other => panic!("expected ClosedDuringFragmentedMessage, got {other:?}"),
  }
}

#[test]
fn server_frames_are_sent_unmasked() {
  let stream = MockStream::with_data(Vec::new());
  let con = Connection::server(stream.to_stream());

  // Even if the caller set a key, the server role strips it.
  con.send_frame(Frame::new(Opcode::Binary, b"plain".to_vec()).with_mask([1, 2, 3, 4])).unwrap();

  let written = decode_frames(stream.copy_written_data());
  assert_eq!(written[0].mask(), None);
  assert_eq!(written[0].payload(), b"plain");
}

#[test]
fn client_frames_are_sent_masked() {
  let stream = MockStream::with_data(Vec::new());
  let con = Connection::client(stream.to_stream());

  con.send_frame(Frame::new(Opcode::Binary, b"secret".to_vec())).unwrap();

  let written = decode_frames(stream.copy_written_data());
  assert!(written[0].mask().is_some());
  assert_eq!(written[0].payload(), b"secret");
}

#[test]
fn close_marks_the_connection_and_senders_unusable() {
  let stream = MockStream::with_data(Vec::new());
  let con = Connection::server(stream.to_stream());
  let sender = con.sender();

  con.close(Some(1000), Some("done")).unwrap();
  assert!(con.is_closed());
  assert!(sender.is_closed());

  assert!(matches!(
    sender.send_frame(Frame::ping(Vec::new())),
    Err(WsError::ConnectionClosed)
  ));
  assert!(matches!(con.close(None, None), Err(WsError::ConnectionClosed)));

  let written = decode_frames(stream.copy_written_data());
  assert_eq!(written.len(), 1);
  assert_eq!(written[0].opcode(), Opcode::Close);
  assert_eq!(written[0].payload(), b"\x03\xe8done");
}

#[test]
fn concurrent_sends_never_interleave() {
  let stream = MockStream::with_data(Vec::new());
  let con = Connection::server(stream.to_stream());

  let sender_a = con.sender();
  let sender_b = sender_a.clone();

  let a = thread::spawn(move || {
    sender_a.send_frame(Frame::new(Opcode::Binary, vec![0xAA; 70000])).unwrap();
  });
  let b = thread::spawn(move || {
    sender_b.send_frame(Frame::new(Opcode::Binary, vec![0xBB; 70000])).unwrap();
  });
  a.join().unwrap();
  b.join().unwrap();

  // Whatever the relative order, the stream must decode into exactly the
  // two intact frames.
  let written = decode_frames(stream.copy_written_data());
  assert_eq!(written.len(), 2);
  let mut first_bytes: Vec<u8> = written.iter().map(|f| f.payload()[0]).collect();
  first_bytes.sort_unstable();
  assert_eq!(first_bytes, vec![0xAA, 0xBB]);
  for frame in &written {
    assert_eq!(frame.payload().len(), 70000);
    assert!(frame.payload().iter().all(|b| *b == frame.payload()[0]));
  }
}
