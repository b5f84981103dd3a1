//! Byte-exact serialization of a large data-plane message: a 500,000-byte
//! payload with attached string metadata, timed mid-simulation, survives a
//! full packetize/depacketize round trip unchanged.

use helics_core::{GlobalFederateId, GlobalHandle, InterfaceHandle, Time};
use helics_message::flags::{ERROR_FLAG, ITERATION_REQUESTED_FLAG, REQUIRED_FLAG};
use helics_message::{packetize, depacketize, ActionCode, ActionMessage, Flags};

fn half_megabyte_send_message() -> ActionMessage {
    let mut msg = ActionMessage::new(ActionCode::SendMessage);
    msg.action_time = Time::from_seconds(45.7);
    msg.source = GlobalHandle::new(GlobalFederateId::new(1), InterfaceHandle::from(0usize));
    msg.dest = GlobalHandle::new(GlobalFederateId::new(2), InterfaceHandle::from(1usize));
    msg.payload = vec![0xAB; 500_000];
    msg.string_data = vec!["x".repeat(50), "y".repeat(50), "z".repeat(50)];
    msg.flags = Flags::empty().with(ITERATION_REQUESTED_FLAG).with(REQUIRED_FLAG).with(ERROR_FLAG);
    msg
}

#[test]
fn e5_large_data_message_round_trips_byte_exact() {
    let original = half_megabyte_send_message();
    let framed = packetize(&original).expect("payload is well under the 16MB frame limit");
    let (decoded, consumed) = depacketize(&framed).expect("frame is well-formed").expect("frame is complete");

    assert_eq!(consumed, framed.len());
    assert_eq!(decoded, original);
    assert_eq!(decoded.payload.len(), 500_000);
    assert_eq!(decoded.string_data.len(), 3);
    assert_eq!(decoded.action_time, Time::from_seconds(45.7));
}

#[test]
fn a_second_message_appended_to_the_same_stream_does_not_desync_the_first() {
    let first = half_megabyte_send_message();
    let mut second = ActionMessage::new(ActionCode::TimeGrant);
    second.action_time = Time::from_seconds(1.0);

    let mut stream = packetize(&first).unwrap();
    stream.extend(packetize(&second).unwrap());

    let (decoded_first, consumed_first) = depacketize(&stream).unwrap().unwrap();
    assert_eq!(decoded_first, first);

    let (decoded_second, consumed_second) = depacketize(&stream[consumed_first..]).unwrap().unwrap();
    assert_eq!(decoded_second, second);
    assert_eq!(consumed_first + consumed_second, stream.len());
}
