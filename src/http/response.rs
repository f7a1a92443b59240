//! Serialization of the handshake response head.

use crate::http::headers::{HeaderLike, Headers};
use crate::http::status::StatusCode;

/// One HTTP response head: status line plus headers. No body support, the
/// handshake answers with headers only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
  /// The response status.
  pub status: StatusCode,
  /// The response headers.
  pub headers: Headers,
}

impl Response {
  /// Creates a response with no headers.
  pub fn new(status: StatusCode) -> Self {
    Self { status, headers: Headers::new() }
  }

  /// Adds a header, builder style.
  pub fn with_header(mut self, name: impl HeaderLike, value: impl AsRef<str>) -> Self {
    self.headers.add(name, value);
    self
  }

  /// Value of the first header with the given name.
  pub fn get_header(&self, name: impl HeaderLike) -> Option<&str> {
    self.headers.get(name)
  }

  /// Serializes the head, terminating empty line included.
  pub fn to_bytes(&self) -> Vec<u8> {
    let mut head =
      format!("HTTP/1.1 {} {}\r\n", self.status.code(), self.status.reason_phrase());
    for header in self.headers.iter() {
      head.push_str(header.name.as_str());
      head.push_str(": ");
      head.push_str(&header.value);
      head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head.into_bytes()
  }
}
