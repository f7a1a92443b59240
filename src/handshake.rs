//! The opening handshake, [RFC 6455 Section 4](https://datatracker.ietf.org/doc/html/rfc6455#section-4).

use crate::error::HandshakeError;
use crate::http::headers::HeaderName;
use crate::http::method::Method;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::StatusCode;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

/// The GUID every accept token is salted with, fixed by RFC 6455.
const HANDSHAKE_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The protocol versions this engine speaks.
pub const SUPPORTED_VERSIONS: &[&str] = &["13"];

/// Validates an upgrade request and produces the 101 response for it.
///
/// Pure function of the request: nothing is read or written here, the caller
/// sends the response (or a [`rejection_response`]) itself.
///
/// Checks, in order: the method is GET, `Upgrade` contains "websocket",
/// `Connection` contains "Upgrade", `Sec-WebSocket-Version` is 13 and
/// `Sec-WebSocket-Key` is a base64 encoded 16 byte value.
pub fn handshake(request: &Request) -> Result<Response, HandshakeError> {
  if request.method != Method::Get {
    return Err(HandshakeError::MalformedRequest(format!(
      "upgrade requires GET, got {}",
      request.method
    )));
  }

  let upgrade = request
    .get_header(HeaderName::Upgrade)
    .ok_or_else(|| HandshakeError::MalformedRequest("missing Upgrade header".to_string()))?;
  if !contains_token(upgrade, "websocket") {
    return Err(HandshakeError::MalformedRequest(format!(
      "Upgrade header does not contain websocket: {upgrade}"
    )));
  }

  let connection = request
    .get_header(HeaderName::Connection)
    .ok_or_else(|| HandshakeError::MalformedRequest("missing Connection header".to_string()))?;
  if !contains_token(connection, "upgrade") {
    return Err(HandshakeError::MalformedRequest(format!(
      "Connection header does not contain Upgrade: {connection}"
    )));
  }

  let version = request.get_header(HeaderName::SecWebSocketVersion).ok_or_else(|| {
    HandshakeError::MalformedRequest("missing Sec-WebSocket-Version header".to_string())
  })?;
  if !SUPPORTED_VERSIONS.contains(&version) {
    return Err(HandshakeError::NotSupported(
      SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect(),
    ));
  }

  let key = request.get_header(HeaderName::SecWebSocketKey).ok_or_else(|| {
    HandshakeError::MalformedRequest("missing Sec-WebSocket-Key header".to_string())
  })?;
  match BASE64_STANDARD.decode(key) {
    Ok(decoded) if decoded.len() == 16 => {}
    Ok(decoded) => {
      return Err(HandshakeError::MalformedRequest(format!(
        "Sec-WebSocket-Key decodes to {} bytes instead of 16",
        decoded.len()
      )))
    }
    Err(_) => {
      return Err(HandshakeError::MalformedRequest(
        "Sec-WebSocket-Key is not valid base64".to_string(),
      ))
    }
  }

  Ok(
    Response::new(StatusCode::SwitchingProtocols)
      .with_header(HeaderName::Upgrade, "websocket")
      .with_header(HeaderName::Connection, "Upgrade")
      .with_header(HeaderName::SecWebSocketAccept, accept_token(key)),
  )
}

/// Computes the `Sec-WebSocket-Accept` token for a client key.
pub fn accept_token(key: &str) -> String {
  let sha1 = Sha1::new().chain_update(key).chain_update(HANDSHAKE_GUID).finalize();
  BASE64_STANDARD.encode(sha1)
}

/// Maps a handshake failure to the HTTP response that reports it.
///
/// Version mismatches answer 426 with a `Sec-WebSocket-Version` header
/// listing what the engine speaks, everything else answers 400.
pub fn rejection_response(error: &HandshakeError) -> Response {
  match error {
    HandshakeError::NotSupported(versions) => Response::new(StatusCode::UpgradeRequired)
      .with_header(HeaderName::SecWebSocketVersion, versions.join(", ")),
    HandshakeError::MalformedRequest(_) => Response::new(StatusCode::BadRequest),
    _ => Response::new(StatusCode::BadRequest),
  }
}

/// True if the comma separated header value contains the token,
/// case-insensitively.
fn contains_token(value: &str, token: &str) -> bool {
  value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token))
}
