//! Gannet is a WebSocket protocol engine over arbitrary duplex byte streams.
//! It negotiates the HTTP upgrade handshake, encodes and decodes wire
//! frames, reassembles fragmented frames into logical messages, and exposes
//! a connection scoped API with one sequential receiver and any number of
//! concurrent senders. The accept loop and socket lifecycle stay with the
//! caller (a minimal one ships behind the `extras` feature); the engine only
//! asks for a blocking duplex stream.

#![warn(missing_docs)]

pub mod connection;
pub mod demux;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod http;
pub mod message;
pub mod stream;

mod logging;

/// Extra glue that is useful for many programs but is not part of the
/// protocol engine itself. Nothing in the engine depends on it.
#[cfg(feature = "extras")]
pub mod extras;

pub use connection::{Connection, Decode, Encode, Endpoint, Sender};
pub use demux::{demultiplex, DemuxState};
pub use error::{HandshakeError, ProtocolError, WsError, WsResult};
pub use frame::{Frame, Opcode};
pub use handshake::{handshake, rejection_response, SUPPORTED_VERSIONS};
pub use message::{ApplicationMessage, ControlMessage, Message};
