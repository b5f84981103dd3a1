//! HELICS: distributed time coordination and message-routing core for
//! co-simulation federations.
//!
//! This root crate ties the component crates together behind a CLI and
//! config surface; the federation semantics themselves live in
//! `helics_core`, `helics_message`, `helics_coordinator`, `helics_runtime`,
//! and (optionally) `helics_federated`.
#![doc = document_features::document_features!()]

pub use helics_core::{GlobalFederateId, HelicsError, Result, Time};
pub use helics_coordinator::{CoordinatorVariant, FederateLifecycle, TimeCoordinator};
pub use helics_message::{ActionCode, ActionMessage};
pub use helics_runtime::{Broker, Core};

#[cfg(feature = "runner")]
pub mod cli;
#[cfg(feature = "runner")]
pub mod config;
#[cfg(feature = "runner")]
pub mod logging;

#[cfg(feature = "runner")]
pub use cli::Cli;
#[cfg(feature = "runner")]
pub use config::NodeConfig;
