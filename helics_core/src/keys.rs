//! Identifiers used throughout the HELICS runtime.
//!
//! Two families of identifier exist. Local identifiers (`LocalFederateId`,
//! `InterfaceHandle`, `RouteId`) are arena keys: cheap opaque indices into a
//! single process's [`helics_tinymap::TinyMap`] registries, never meaningful
//! outside that process. Global identifiers (`GlobalFederateId`,
//! `GlobalBrokerId`, `GlobalHandle`) are assigned by the root broker and are
//! meaningful federation-wide; they travel inside [`crate::Time`]-adjacent
//! `ActionMessage` fields across the wire.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

helics_tinymap::key_type! {
    /// Arena key for a federate registered with a local Core, valid only
    /// within that Core's process.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub LocalFederateId
}

helics_tinymap::key_type! {
    /// Arena key for an endpoint/publication/input/filter interface handle,
    /// valid only within its owning process.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub InterfaceHandle
}

helics_tinymap::key_type! {
    /// Arena key into a Core or Broker's routing table.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub RouteId
}

/// Federation-wide broker id, assigned by the root broker during the
/// registration handshake.
///
/// Broker ids are allocated from the same space as federate ids to simplify
/// the "is this id a broker" check used throughout message routing: any id
/// greater than or equal to [`GlobalFederateId::BROKER_ID_OFFSET`], or equal
/// to the reserved root broker id of `1`, is a broker.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct GlobalBrokerId(i32);

/// Federation-wide federate id, assigned by the root broker during the
/// registration handshake.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct GlobalFederateId(i32);

impl GlobalFederateId {
    /// Sentinel for "not yet assigned" / "unknown".
    pub const INVALID: GlobalFederateId = GlobalFederateId(-1);
    /// The root broker's reserved id.
    pub const ROOT_BROKER_ID: GlobalFederateId = GlobalFederateId(1);
    /// Ids at or above this value are brokers, not federates.
    pub const BROKER_ID_OFFSET: i32 = 0x7000_0000;

    pub const fn new(raw: i32) -> Self {
        GlobalFederateId(raw)
    }

    pub const fn raw(&self) -> i32 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 >= 0 || self.0 == Self::ROOT_BROKER_ID.0
    }

    /// Mirrors `isBroker` in the original HELICS core routing code: ids `>=
    /// BROKER_ID_OFFSET`, plus the reserved root id `1`, name a broker.
    pub const fn is_broker(&self) -> bool {
        self.0 == Self::ROOT_BROKER_ID.0 || self.0 >= Self::BROKER_ID_OFFSET
    }

    /// The broker id that owns this federate id, if this id was allocated
    /// with a broker offset baked in.
    pub fn parent_broker_id(&self) -> GlobalBrokerId {
        if self.0 >= Self::BROKER_ID_OFFSET {
            GlobalBrokerId((self.0 / Self::BROKER_ID_OFFSET) * Self::BROKER_ID_OFFSET)
        } else {
            GlobalBrokerId(Self::ROOT_BROKER_ID.0)
        }
    }
}

impl GlobalBrokerId {
    pub const INVALID: GlobalBrokerId = GlobalBrokerId(-1);
    pub const ROOT_BROKER_ID: GlobalBrokerId = GlobalBrokerId(1);

    pub const fn new(raw: i32) -> Self {
        GlobalBrokerId(raw)
    }

    pub const fn raw(&self) -> i32 {
        self.0
    }

    pub const fn as_federate_id(&self) -> GlobalFederateId {
        GlobalFederateId(self.0)
    }
}

impl From<GlobalBrokerId> for GlobalFederateId {
    fn from(id: GlobalBrokerId) -> Self {
        GlobalFederateId(id.0)
    }
}

/// A fully-qualified interface handle: which federate owns it, and which
/// local handle on that federate it is. Travels in `ActionMessage` source
/// and destination fields.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GlobalHandle {
    pub fed_id: GlobalFederateId,
    pub handle: InterfaceHandle,
}

impl GlobalHandle {
    pub fn new(fed_id: GlobalFederateId, handle: InterfaceHandle) -> Self {
        Self { fed_id, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_broker_is_a_broker() {
        assert!(GlobalFederateId::ROOT_BROKER_ID.is_broker());
    }

    #[test]
    fn offset_ids_are_brokers() {
        let id = GlobalFederateId::new(GlobalFederateId::BROKER_ID_OFFSET + 5);
        assert!(id.is_broker());
    }

    #[test]
    fn ordinary_federate_is_not_a_broker() {
        let id = GlobalFederateId::new(42);
        assert!(!id.is_broker());
    }

    #[test]
    fn invalid_is_never_valid() {
        assert!(!GlobalFederateId::INVALID.is_valid());
    }
}
