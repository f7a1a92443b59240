//! Thin glue around the engine that most programs need but that is not part
//! of the protocol itself. Nothing in the engine depends on anything in
//! extras.

pub mod tcp_app;
