//! Parsing of the upgrade request head.

use crate::error::{ProtocolError, WsResult};
use crate::http::headers::{HeaderLike, Headers};
use crate::http::method::Method;
use crate::stream::ConnectionStreamRead;

/// Longest accepted request or header line, terminator included.
const MAX_HEAD_LINE: usize = 8192;

/// One parsed HTTP request head: request line plus headers.
///
/// Bodies are not read; the handshake has no use for them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
  /// The request method.
  pub method: Method,
  /// The request target, query string included.
  pub path: String,
  /// The HTTP version token, e.g. "HTTP/1.1".
  pub version: String,
  /// The request headers.
  pub headers: Headers,
}

impl Request {
  /// Value of the first header with the given name.
  pub fn get_header(&self, name: impl HeaderLike) -> Option<&str> {
    self.headers.get(name)
  }

  /// Reads and parses one request head from the stream, blocking until the
  /// terminating empty line. Returns `Ok(None)` if the stream was cleanly at
  /// EOF before the first byte.
  pub fn from_stream(stream: &dyn ConnectionStreamRead) -> WsResult<Option<Self>> {
    let request_line = match read_head_line(stream)? {
      Some(line) => line,
      None => return Ok(None),
    };

    let mut parts = request_line.split(' ');
    let method = parts
      .next()
      .filter(|m| !m.is_empty())
      .map(Method::from_name)
      .ok_or_else(|| malformed("empty request line"))?;
    let path =
      parts.next().filter(|p| !p.is_empty()).ok_or_else(|| malformed("missing request target"))?;
    let version = parts.next().ok_or_else(|| malformed("missing http version"))?;
    if parts.next().is_some() {
      return Err(malformed("too many tokens on the request line").into());
    }
    if !version.starts_with("HTTP/") {
      return Err(malformed("invalid http version").into());
    }

    let mut headers = Headers::new();
    loop {
      let line = match read_head_line(stream)? {
        Some(line) => line,
        None => return Err(malformed("stream ended inside the request head").into()),
      };
      if line.is_empty() {
        break;
      }

      let (name, value) =
        line.split_once(':').ok_or_else(|| malformed("header line without a colon"))?;
      if name.is_empty() {
        return Err(malformed("empty header name").into());
      }
      headers.add(name, value.trim_start());
    }

    Ok(Some(Request {
      method,
      path: path.to_string(),
      version: version.to_string(),
      headers,
    }))
  }
}

/// Reads one CRLF terminated line, returning it without the terminator.
/// `Ok(None)` means the stream was at EOF before the first byte of the line.
fn read_head_line(stream: &dyn ConnectionStreamRead) -> WsResult<Option<String>> {
  let mut buf: Vec<u8> = Vec::with_capacity(256);
  let count = stream.read_until(0xA, MAX_HEAD_LINE, &mut buf)?;
  if count == 0 {
    return Ok(None);
  }

  let line = std::str::from_utf8(&buf).map_err(|_| malformed("head line is not valid ascii"))?;
  let line =
    line.strip_suffix("\r\n").ok_or_else(|| malformed("head line is missing its CRLF"))?;
  Ok(Some(line.to_string()))
}

fn malformed(reason: &str) -> ProtocolError {
  ProtocolError::MalformedRequestHead(reason.to_string())
}
