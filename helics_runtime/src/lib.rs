#![doc=include_str!( "../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

pub mod broker;
pub mod bus;
pub mod core;
pub mod fed_state;
pub mod filter;
pub mod handle;
pub mod query;
pub mod translator;

pub use broker::Broker;
pub use bus::ActionBus;
pub use core::Core;
pub use fed_state::{FederateState, ProcessResult};
pub use filter::{FilterCoordinator, FilterFederate, FilterInfo, FilterKind};
pub use handle::{HandleInfo, HandleManager, InterfaceKind};
pub use translator::{TranslatorInfo, TranslatorType, Value};
