//! The 16-bit flag field carried by every [`crate::ActionMessage`].
//!
//! Bit positions are fixed by the wire protocol and mirror the
//! `GeneralFlags` / `TimingFlags` / `InterfaceFlags` / `ConnectionFlags` /
//! `MessageFlags` groups of the original HELICS flag tables; a message
//! produced by one node must mean the same thing bit-for-bit at any other
//! node in the federation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! flag_bits {
    ($($(#[$meta:meta])* $name:ident = $bit:expr;)*) => {
        $(
            $(#[$meta])*
            pub const $name: u16 = $bit;
        )*
    };
}

flag_bits! {
    // General
    /// An error condition is associated with this message.
    ERROR_FLAG = 4;
    /// Used for setting values / generic indicator.
    INDICATOR_FLAG = 5;

    // Timing
    /// An iteration has been requested.
    ITERATION_REQUESTED_FLAG = 0;
    /// Request originates from a non-granting federate.
    NON_GRANTING_FLAG = 7;
    /// This event was interrupted (event horizon violated).
    INTERRUPTED_FLAG = 8;
    /// Request originates from a federate with delayed timing.
    DELAYED_TIMING_FLAG = 10;
    /// Message originates from a parent object.
    PARENT_FLAG = 13;
    /// Message originates from a child object.
    CHILD_FLAG = 14;

    // Interface
    /// The interface buffers data rather than coalescing updates.
    BUFFER_DATA_FLAG = 0;
    /// The named target is a destination target.
    DESTINATION_TARGET_FLAG = 1;
    /// A match for this interface is required.
    REQUIRED_FLAG = 2;
    /// The interface accepts only a single connection.
    SINGLE_CONNECTION_FLAG = 3;
    /// Values are updated only on change.
    ONLY_UPDATE_ON_CHANGE_FLAG = 6;
    /// The target is a resolved regex/alias mapping.
    RECONNECTABLE_FLAG = 7;
    /// The connection is optional and may go unmatched.
    OPTIONAL_FLAG = 8;
    /// Transmit only on change.
    ONLY_TRANSMIT_ON_CHANGE_FLAG = 12;
    /// The interface has no name.
    NAMELESS_INTERFACE_FLAG = 15;

    // Endpoint
    TARGETED_FLAG = 10;
    HAS_SOURCE_FILTER_FLAG = 11;
    SOURCE_ONLY_FLAG = 13;
    RECEIVE_ONLY_FLAG = 14;

    // Filter
    CLONE_FLAG = 9;
    HAS_DEST_FILTER_FLAG = 13;
    HAS_NON_CLONING_DEST_FILTER_FLAG = 14;

    // Connection
    CORE_FLAG = 3;
    GLOBAL_TIMING_FLAG = 5;
    USE_JSON_SERIALIZATION_FLAG = 6;
    ASYNC_TIMING_FLAG = 7;
    OBSERVER_FLAG = 8;
    DYNAMIC_JOIN_FLAG = 9;
    REENTRANT_FLAG = 10;
    GLOBAL_DISCONNECT_FLAG = 11;
    DISCONNECTED_FLAG = 12;
    TEST_CONNECTION_FLAG = 13;
    SLOW_RESPONDING_FLAG = 14;
    NON_COUNTING_FLAG = 15;

    // Message
    FILTER_PROCESSING_REQUIRED_FLAG = 7;
    DESTINATION_PROCESSING_FLAG = 11;
    EMPTY_FLAG = 15;

    // Operation
    CANCEL_FLAG = 13;

    // Command modifiers used by the time-request dispatch table
    ITERATE_IF_NEEDED_FLAG = 0;
    FORCE_ITERATION_FLAG = 1;
}

/// A 16-bit flag bitset, indexed by the bit constants above.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct Flags(pub u16);

impl Flags {
    pub const fn empty() -> Self {
        Flags(0)
    }

    pub const fn is_set(&self, bit: u16) -> bool {
        (self.0 >> bit) & 1 == 1
    }

    pub fn set(&mut self, bit: u16) {
        self.0 |= 1 << bit;
    }

    pub fn clear(&mut self, bit: u16) {
        self.0 &= !(1 << bit);
    }

    pub fn with(mut self, bit: u16) -> Self {
        self.set(bit);
        self
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }

    pub const fn from_raw(raw: u16) -> Self {
        Flags(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_query_round_trips() {
        let mut f = Flags::empty();
        assert!(!f.is_set(ERROR_FLAG));
        f.set(ERROR_FLAG);
        assert!(f.is_set(ERROR_FLAG));
        f.clear(ERROR_FLAG);
        assert!(!f.is_set(ERROR_FLAG));
    }

    #[test]
    fn builder_style_with() {
        let f = Flags::empty().with(ITERATION_REQUESTED_FLAG).with(REQUIRED_FLAG);
        assert!(f.is_set(ITERATION_REQUESTED_FLAG));
        assert!(f.is_set(REQUIRED_FLAG));
        assert!(!f.is_set(ERROR_FLAG));
    }
}
