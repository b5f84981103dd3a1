//! The action code carried by every [`crate::ActionMessage`].
//!
//! Discriminants are part of the wire format: once assigned, a value must
//! never be reused or renumbered, or two builds of the federation would
//! silently talk past each other on the wire.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ActionCode {
    /// Placeholder for "no operation"; dropped by every handler.
    Ignore = 0,

    // -- priority: federation setup/teardown --
    RegFed = 10,
    RegBroker = 11,
    FedAck = 12,
    BrokerAck = 13,
    PriorityDisconnect = 14,
    Query = 15,
    QueryReply = 16,

    // -- timing --
    TimeRequest = 30,
    TimeGrant = 31,
    ExecRequest = 32,
    ExecGrant = 33,
    TimeCheck = 34,
    ExecCheck = 35,
    TimingInfo = 36,
    TimeBlock = 37,
    TimeUnblock = 38,
    TimeBarrier = 39,
    TimeBarrierClear = 40,
    ForceTimeGrant = 41,
    RequestCurrentTime = 42,

    // -- data / routing --
    Pub = 60,
    SendMessage = 61,
    SendForFilter = 62,
    SendForFilterAndReturn = 63,
    FilterResult = 64,
    NullMessage = 65,
    MultiMessage = 66,

    // -- configuration / registration --
    RegPublication = 80,
    RegInput = 81,
    RegEndpoint = 82,
    RegFilter = 83,
    RegTranslator = 84,
    AddDependency = 85,
    AddDependent = 86,
    RemoveDependency = 87,
    RemoveDependent = 88,
    AddTarget = 89,
    RemoveTarget = 90,
    CoreConfigure = 91,

    // -- lifecycle / error --
    InitGrant = 100,
    ExecGrantComplete = 101,
    Stop = 102,
    TerminateImmediately = 103,
    Disconnect = 104,
    Error = 105,
    LocalError = 106,
    GlobalError = 107,

    // -- federation control --
    SendCommand = 120,
}

impl ActionCode {
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized action code {0}")]
pub struct UnknownActionCode(pub i32);

impl TryFrom<i32> for ActionCode {
    type Error = UnknownActionCode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use ActionCode::*;
        Ok(match value {
            0 => Ignore,
            10 => RegFed,
            11 => RegBroker,
            12 => FedAck,
            13 => BrokerAck,
            14 => PriorityDisconnect,
            15 => Query,
            16 => QueryReply,
            30 => TimeRequest,
            31 => TimeGrant,
            32 => ExecRequest,
            33 => ExecGrant,
            34 => TimeCheck,
            35 => ExecCheck,
            36 => TimingInfo,
            37 => TimeBlock,
            38 => TimeUnblock,
            39 => TimeBarrier,
            40 => TimeBarrierClear,
            41 => ForceTimeGrant,
            42 => RequestCurrentTime,
            60 => Pub,
            61 => SendMessage,
            62 => SendForFilter,
            63 => SendForFilterAndReturn,
            64 => FilterResult,
            65 => NullMessage,
            66 => MultiMessage,
            80 => RegPublication,
            81 => RegInput,
            82 => RegEndpoint,
            83 => RegFilter,
            84 => RegTranslator,
            85 => AddDependency,
            86 => AddDependent,
            87 => RemoveDependency,
            88 => RemoveDependent,
            89 => AddTarget,
            90 => RemoveTarget,
            91 => CoreConfigure,
            100 => InitGrant,
            101 => ExecGrantComplete,
            102 => Stop,
            103 => TerminateImmediately,
            104 => Disconnect,
            105 => Error,
            106 => LocalError,
            107 => GlobalError,
            120 => SendCommand,
            other => return Err(UnknownActionCode(other)),
        })
    }
}

impl ActionCode {
    /// Priority-class actions bypass ordered queues and are delivered ahead
    /// of non-priority traffic even if enqueued later.
    pub const fn is_priority(self) -> bool {
        matches!(
            self,
            ActionCode::RegFed
                | ActionCode::RegBroker
                | ActionCode::FedAck
                | ActionCode::BrokerAck
                | ActionCode::PriorityDisconnect
                | ActionCode::Query
                | ActionCode::QueryReply
        )
    }

    pub const fn is_timing(self) -> bool {
        matches!(
            self,
            ActionCode::TimeRequest
                | ActionCode::TimeGrant
                | ActionCode::ExecRequest
                | ActionCode::ExecGrant
                | ActionCode::TimeCheck
                | ActionCode::ExecCheck
                | ActionCode::TimingInfo
                | ActionCode::TimeBlock
                | ActionCode::TimeUnblock
                | ActionCode::TimeBarrier
                | ActionCode::TimeBarrierClear
                | ActionCode::ForceTimeGrant
                | ActionCode::RequestCurrentTime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_discriminant() {
        for code in [
            ActionCode::Ignore,
            ActionCode::RegFed,
            ActionCode::TimeGrant,
            ActionCode::SendMessage,
            ActionCode::MultiMessage,
            ActionCode::GlobalError,
            ActionCode::SendCommand,
        ] {
            let raw = code.as_i32();
            assert_eq!(ActionCode::try_from(raw).unwrap(), code);
        }
    }

    #[test]
    fn unknown_code_errors() {
        assert!(ActionCode::try_from(999_999).is_err());
    }
}
