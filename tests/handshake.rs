use crate::mock_stream::MockStream;
use gannet::http::{Method, Request, StatusCode};
use gannet::{handshake, rejection_response, Connection, HandshakeError};


const UPGRADE_REQUEST: &str = "GET /chat HTTP/1.1\r\n\
Host: server.example.com\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\
\r\n";

fn parse_request(raw: &str) -> Request {
  let stream = MockStream::with_str(raw);
  let mut con = Connection::server(stream.to_stream());
  con.receive::<Request>().expect("parse failed").expect("no request")
}

#[test]
fn parses_the_upgrade_request_head() {
  let request = parse_request(UPGRADE_REQUEST);

  assert_eq!(request.method, Method::Get);
  assert_eq!(request.path, "/chat");
  assert_eq!(request.version, "HTTP/1.1");
  assert_eq!(request.get_header("host"), Some("server.example.com"));
  assert_eq!(request.get_header("SEC-WEBSOCKET-KEY"), Some("dGhlIHNhbXBsZSBub25jZQ=="));
}

#[test]
fn rfc6455_accept_vector() {
  let response = handshake(&parse_request(UPGRADE_REQUEST)).expect("handshake failed");

  assert_eq!(response.status, StatusCode::SwitchingProtocols);
  assert_eq!(response.get_header("Upgrade"), Some("websocket"));
  assert_eq!(response.get_header("Connection"), Some("Upgrade"));
  assert_eq!(response.get_header("Sec-WebSocket-Accept"), Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
}

#[test]
fn response_head_serialization() {
  let response = handshake(&parse_request(UPGRADE_REQUEST)).expect("handshake failed");
  let bytes = String::from_utf8(response.to_bytes()).expect("head is text");

  assert!(bytes.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
  assert!(bytes.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
  assert!(bytes.ends_with("\r\n\r\n"));
}

#[test]
fn connection_header_may_list_several_tokens() {
  let request = parse_request(&UPGRADE_REQUEST.replace(
    "Connection: Upgrade",
    "Connection: keep-alive, Upgrade",
  ));

  assert!(handshake(&request).is_ok());
}

#[test]
fn rejects_version_mismatch() {
  let request = parse_request(&UPGRADE_REQUEST.replace("Version: 13", "Version: 8"));

  match handshake(&request) {
    Err(HandshakeError::NotSupported(versions)) => assert_eq!(versions, vec!["13".to_string()]),
    other => panic!("expected NotSupported, got {other:?}"),
  }
}

#[test]
fn rejects_missing_key() {
  let request = parse_request(&UPGRADE_REQUEST.replace(
    "Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n",
    "",
  ));

  assert!(matches!(handshake(&request), Err(HandshakeError::MalformedRequest(_))));
}

#[test]
fn rejects_key_of_wrong_length() {
  // "c2hvcnQ=" is valid base64 but decodes to 5 bytes
  let request =
    parse_request(&UPGRADE_REQUEST.replace("dGhlIHNhbXBsZSBub25jZQ==", "c2hvcnQ="));

  assert!(matches!(handshake(&request), Err(HandshakeError::MalformedRequest(_))));
}

#[test]
fn rejects_key_that_is_not_base64() {
  let request =
    parse_request(&UPGRADE_REQUEST.replace("dGhlIHNhbXBsZSBub25jZQ==", "*definitely not*"));

  assert!(matches!(handshake(&request), Err(HandshakeError::MalformedRequest(_))));
}

#[test]
fn rejects_non_get_method() {
  let request = parse_request(&UPGRADE_REQUEST.replace("GET ", "POST "));

  assert!(matches!(handshake(&request), Err(HandshakeError::MalformedRequest(_))));
}

#[test]
fn rejects_missing_upgrade_header() {
  let request = parse_request(&UPGRADE_REQUEST.replace("Upgrade: websocket\r\n", ""));

  assert!(matches!(handshake(&request), Err(HandshakeError::MalformedRequest(_))));
}

#[test]
fn version_rejection_response_lists_supported_versions() {
  let response =
    rejection_response(&HandshakeError::NotSupported(vec!["13".to_string()]));

  assert_eq!(response.status, StatusCode::UpgradeRequired);
  assert_eq!(response.get_header("Sec-WebSocket-Version"), Some("13"));
}

#[test]
fn malformed_rejection_response_is_bad_request() {
  let response = rejection_response(&HandshakeError::MalformedRequest("nope".to_string()));

  assert_eq!(response.status, StatusCode::BadRequest);
}

#[test]
fn clean_eof_before_request_is_none() {
  let stream = MockStream::with_data(Vec::new());
  let mut con = Connection::server(stream.to_stream());

  assert!(con.receive::<Request>().expect("eof is not an error").is_none());
}

#[test]
fn truncated_request_head_is_an_error() {
  let stream = MockStream::with_str("GET /chat HTTP/1.1\r\nHost: incomplete");
  let mut con = Connection::server(stream.to_stream());

  assert!(con.receive::<Request>().is_err());
}
