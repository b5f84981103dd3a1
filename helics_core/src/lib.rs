//! Core identifier, time, and error types shared across every HELICS crate.

pub mod error;
pub mod keys;
pub mod time;

pub use error::{HelicsError, Result};
pub use keys::{GlobalBrokerId, GlobalFederateId, GlobalHandle, InterfaceHandle, LocalFederateId, RouteId};
pub use time::Time;
