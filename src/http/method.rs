//! HTTP request methods.

use std::fmt::Display;

/// The method of a request. Only `GET` can open a WebSocket, the rest exist
/// so a rejected request can still be parsed and answered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Method {
  /// The GET method.
  Get,
  /// The HEAD method.
  Head,
  /// The POST method.
  Post,
  /// The PUT method.
  Put,
  /// The DELETE method.
  Delete,
  /// The OPTIONS method.
  Options,
  /// Any other token on the request line.
  Other(String),
}

impl Method {
  /// Parses a method from its request line token.
  pub fn from_name(name: &str) -> Self {
    match name {
      "GET" => Method::Get,
      "HEAD" => Method::Head,
      "POST" => Method::Post,
      "PUT" => Method::Put,
      "DELETE" => Method::Delete,
      "OPTIONS" => Method::Options,
      other => Method::Other(other.to_string()),
    }
  }

  /// The on-wire spelling.
  pub fn as_str(&self) -> &str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Options => "OPTIONS",
      Method::Other(name) => name.as_str(),
    }
  }
}

impl Display for Method {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
