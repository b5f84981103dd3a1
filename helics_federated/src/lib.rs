//! Network transport for HELICS core/broker connections.
//!
//! This crate carries [`helics_message::ActionMessage`] between processes.
//! It owns no federation semantics: routing, time coordination, and
//! filtering live in `helics_coordinator`/`helics_runtime`, which depend on
//! this crate (via the `federated` feature) rather than the other way
//! around.
#![deny(clippy::all)]

pub mod error;
pub mod local;
pub mod tcp;
mod util;

pub use error::{Result, TransportError};
pub use local::LocalEndpoint;
pub use tcp::{TcpAcceptor, TcpConnection};
pub use util::mpsc_sink::UnboundedSenderSink;
