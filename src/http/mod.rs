//! The handshake subset of HTTP.
//!
//! This is not a general purpose HTTP implementation. It parses exactly one
//! upgrade request head and serializes exactly one response head, which is
//! all the WebSocket opening handshake needs.

pub mod headers;
pub mod method;
pub mod request;
pub mod response;
pub mod status;

pub use headers::{Header, HeaderName, Headers};
pub use method::Method;
pub use request::Request;
pub use response::Response;
pub use status::StatusCode;
