//! Response status codes.

/// The status codes the handshake can answer with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusCode {
  /// 101, the successful upgrade.
  SwitchingProtocols,
  /// 400, malformed upgrade request.
  BadRequest,
  /// 426, version negotiation failed.
  UpgradeRequired,
  /// 500, the server gave up.
  InternalServerError,
}

impl StatusCode {
  /// The numeric code.
  pub fn code(&self) -> u16 {
    match self {
      StatusCode::SwitchingProtocols => 101,
      StatusCode::BadRequest => 400,
      StatusCode::UpgradeRequired => 426,
      StatusCode::InternalServerError => 500,
    }
  }

  /// The reason phrase sent on the status line.
  pub fn reason_phrase(&self) -> &'static str {
    match self {
      StatusCode::SwitchingProtocols => "Switching Protocols",
      StatusCode::BadRequest => "Bad Request",
      StatusCode::UpgradeRequired => "Upgrade Required",
      StatusCode::InternalServerError => "Internal Server Error",
    }
  }
}
