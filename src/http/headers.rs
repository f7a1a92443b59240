//! Header handling for the upgrade exchange.

use std::fmt::Display;

/// An ordered collection of headers. Header names compare case-insensitively.
///
/// Anywhere a header name is expected, both a [`HeaderName`] and a plain
/// string work, since both implement [`HeaderLike`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Headers(Vec<Header>);

/// A single header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header {
  /// The name of the header.
  pub name: HeaderName,
  /// The raw value of the header.
  pub value: String,
}

impl Headers {
  /// Creates an empty collection.
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of headers in the collection.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// True if the collection is empty.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Creates and appends a header.
  pub fn add(&mut self, name: impl HeaderLike, value: impl AsRef<str>) {
    self.0.push(Header::new(name, value));
  }

  /// Value of the first header with the given name.
  pub fn get(&self, name: impl HeaderLike) -> Option<&str> {
    let header = name.to_header();
    self.0.iter().find(|h| h.name == header).map(|h| h.value.as_str())
  }

  /// All values of headers with the given name, empty if there are none.
  pub fn get_all(&self, name: impl HeaderLike) -> Vec<&str> {
    let header = name.to_header();
    self.0.iter().filter(|h| h.name == header).map(|h| h.value.as_str()).collect()
  }

  /// Removes all headers with the given name.
  pub fn remove(&mut self, name: impl HeaderLike) {
    let header = name.to_header();
    self.0.retain(|h| h.name != header);
  }

  /// Iterates over the headers in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = &Header> {
    self.0.iter()
  }
}

impl Header {
  /// Creates a header from a name and a value.
  pub fn new(name: impl HeaderLike, value: impl AsRef<str>) -> Self {
    Self { name: name.to_header(), value: value.as_ref().to_string() }
  }
}

/// A type that can be interpreted as a header name.
pub trait HeaderLike {
  /// Consumes the value and returns the corresponding header name.
  fn to_header(self) -> HeaderName;
}

impl HeaderLike for HeaderName {
  fn to_header(self) -> HeaderName {
    self
  }
}

impl HeaderLike for &HeaderName {
  fn to_header(self) -> HeaderName {
    self.clone()
  }
}

impl<T> HeaderLike for T
where
  T: AsRef<str>,
{
  fn to_header(self) -> HeaderName {
    HeaderName::from(self.as_ref())
  }
}

/// The header names the upgrade exchange cares about, plus an escape hatch
/// for everything else.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HeaderName {
  /// The host the request is addressed to.
  Host,
  /// The protocol the client wants to switch to.
  Upgrade,
  /// Connection options, must contain "Upgrade" during the handshake.
  Connection,
  /// The client's base64 nonce.
  SecWebSocketKey,
  /// The WebSocket protocol version the client speaks.
  SecWebSocketVersion,
  /// The server's proof that it saw the client key.
  SecWebSocketAccept,
  /// Any other header. Stored lowercased so equality stays case-insensitive.
  Other(String),
}

impl HeaderName {
  /// The canonical on-wire spelling of the header name.
  pub fn as_str(&self) -> &str {
    match self {
      HeaderName::Host => "Host",
      HeaderName::Upgrade => "Upgrade",
      HeaderName::Connection => "Connection",
      HeaderName::SecWebSocketKey => "Sec-WebSocket-Key",
      HeaderName::SecWebSocketVersion => "Sec-WebSocket-Version",
      HeaderName::SecWebSocketAccept => "Sec-WebSocket-Accept",
      HeaderName::Other(name) => name.as_str(),
    }
  }
}

impl From<&str> for HeaderName {
  fn from(name: &str) -> Self {
    if name.eq_ignore_ascii_case("Host") {
      HeaderName::Host
    } else if name.eq_ignore_ascii_case("Upgrade") {
      HeaderName::Upgrade
    } else if name.eq_ignore_ascii_case("Connection") {
      HeaderName::Connection
    } else if name.eq_ignore_ascii_case("Sec-WebSocket-Key") {
      HeaderName::SecWebSocketKey
    } else if name.eq_ignore_ascii_case("Sec-WebSocket-Version") {
      HeaderName::SecWebSocketVersion
    } else if name.eq_ignore_ascii_case("Sec-WebSocket-Accept") {
      HeaderName::SecWebSocketAccept
    } else {
      HeaderName::Other(name.to_ascii_lowercase())
    }
  }
}

impl Display for HeaderName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
