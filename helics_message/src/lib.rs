//! The ActionMessage bus: the uniform wire format and routing envelope
//! carried by every control and data event in a HELICS federation.

pub mod action;
pub mod flags;
pub mod message;
pub mod query;
pub mod wire;

pub use action::ActionCode;
pub use flags::Flags;
pub use message::ActionMessage;
pub use query::{FederationCommand, Query};
pub use wire::{depacketize, packetize, ActionMessageCodec, WireError};
