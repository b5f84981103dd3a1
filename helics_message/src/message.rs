//! The [`ActionMessage`], HELICS's sole inter-node wire unit, and its
//! byte-exact framing.

use helics_core::{GlobalFederateId, GlobalHandle, InterfaceHandle, Time};
use helics_tinymap::Key;

use crate::action::ActionCode;
use crate::flags::Flags;

/// Sentinel byte opening every framed message.
pub const FRAME_START: u8 = 0xF3;
/// Two-byte sentinel closing every framed message.
pub const FRAME_END: [u8; 2] = [0xFA, 0xFC];

/// The sole inter-node unit of communication in a HELICS federation.
///
/// Every control and data event — federation setup, time coordination,
/// value publication, message delivery, filtering — travels as one of
/// these. Fields beyond `action` are a fixed layout regardless of which
/// action is set; unused fields are left at their default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMessage {
    pub action: ActionCode,
    pub message_id: i32,
    pub source: GlobalHandle,
    pub dest: GlobalHandle,
    pub counter: i16,
    pub flags: Flags,
    pub sequence_id: i32,
    pub extra_data: i32,
    pub extra_dest_data: i32,
    pub action_time: Time,
    /// Event horizon: earliest time this source may next produce a
    /// visible event.
    pub te: Time,
    /// Minimum dependency event time, over the source's own dependencies.
    pub tdemin: Time,
    pub payload: Vec<u8>,
    pub string_data: Vec<String>,
}

impl ActionMessage {
    /// Packs `inner` into a single `MULTI_MESSAGE` container, each member
    /// fully framed via [`crate::wire::packetize`] and concatenated
    /// length-prefixed into the outer message's `payload` — raw bytes, not
    /// `string_data`, so the framing sentinels and any binary payload of
    /// the inner messages survive intact.
    pub fn pack_multi_message(
        source: GlobalFederateId,
        inner: &[ActionMessage],
    ) -> Result<ActionMessage, crate::wire::WireError> {
        let mut payload = Vec::new();
        for msg in inner {
            let framed = crate::wire::packetize(msg)?;
            payload.extend_from_slice(&(framed.len() as u32).to_be_bytes());
            payload.extend_from_slice(&framed);
        }
        let mut batch = ActionMessage::new(ActionCode::MultiMessage);
        batch.source.fed_id = source;
        batch.payload = payload;
        Ok(batch)
    }

    /// Unpacks a `MULTI_MESSAGE` produced by [`ActionMessage::pack_multi_message`]
    /// back into its constituent messages, byte-exact.
    pub fn unpack_multi_message(&self) -> Result<Vec<ActionMessage>, crate::wire::WireError> {
        let mut cur = Cursor { buf: &self.payload, pos: 0 };
        let mut out = Vec::new();
        while cur.pos < cur.buf.len() {
            let len = cur.read_u32()? as usize;
            let framed = cur.read_bytes(len)?;
            let (msg, consumed) = crate::wire::depacketize(framed)?
                .ok_or(crate::wire::WireError::Truncated)?;
            if consumed != framed.len() {
                return Err(crate::wire::WireError::Truncated);
            }
            out.push(msg);
        }
        Ok(out)
    }

    pub fn new(action: ActionCode) -> Self {
        ActionMessage {
            action,
            message_id: 0,
            source: GlobalHandle::default(),
            dest: GlobalHandle::default(),
            counter: 0,
            flags: Flags::empty(),
            sequence_id: 0,
            extra_data: 0,
            extra_dest_data: 0,
            action_time: Time::ZERO,
            te: Time::ZERO,
            tdemin: Time::ZERO,
            payload: Vec::new(),
            string_data: Vec::new(),
        }
    }

    pub fn source_id(&self) -> GlobalFederateId {
        self.source.fed_id
    }

    pub fn dest_id(&self) -> GlobalFederateId {
        self.dest.fed_id
    }

    pub fn is_priority(&self) -> bool {
        self.action.is_priority()
    }

    /// Encode this message into the portable fixed-layout body used by the
    /// wire format (everything between the framing sentinel and tail).
    pub fn encode_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(64 + self.payload.len());
        body.extend_from_slice(&self.action.as_i32().to_be_bytes());
        body.extend_from_slice(&self.message_id.to_be_bytes());
        body.extend_from_slice(&self.source.fed_id.raw().to_be_bytes());
        body.extend_from_slice(&(self.source.handle.index() as i32).to_be_bytes());
        body.extend_from_slice(&self.dest.fed_id.raw().to_be_bytes());
        body.extend_from_slice(&(self.dest.handle.index() as i32).to_be_bytes());
        body.extend_from_slice(&self.counter.to_be_bytes());
        body.extend_from_slice(&self.flags.raw().to_be_bytes());
        body.extend_from_slice(&self.sequence_id.to_be_bytes());
        body.extend_from_slice(&self.extra_data.to_be_bytes());
        body.extend_from_slice(&self.extra_dest_data.to_be_bytes());
        body.extend_from_slice(&self.action_time.as_nanoseconds().to_be_bytes());
        body.extend_from_slice(&self.te.as_nanoseconds().to_be_bytes());
        body.extend_from_slice(&self.tdemin.as_nanoseconds().to_be_bytes());

        body.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        body.extend_from_slice(&self.payload);

        body.extend_from_slice(&(self.string_data.len() as u32).to_be_bytes());
        for s in &self.string_data {
            let bytes = s.as_bytes();
            body.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            body.extend_from_slice(bytes);
        }
        body
    }

    /// Decode a message body produced by [`ActionMessage::encode_body`].
    pub fn decode_body(body: &[u8]) -> Result<Self, crate::wire::WireError> {
        let mut cur = Cursor { buf: body, pos: 0 };

        let action_raw = cur.read_i32()?;
        let action = ActionCode::try_from(action_raw)
            .map_err(|e| crate::wire::WireError::Malformed(e.to_string()))?;
        let message_id = cur.read_i32()?;
        let source_id = cur.read_i32()?;
        let source_handle = cur.read_i32()?;
        let dest_id = cur.read_i32()?;
        let dest_handle = cur.read_i32()?;
        let counter = cur.read_i16()?;
        let flags = cur.read_u16()?;
        let sequence_id = cur.read_i32()?;
        let extra_data = cur.read_i32()?;
        let extra_dest_data = cur.read_i32()?;
        let action_time = cur.read_i64()?;
        let te = cur.read_i64()?;
        let tdemin = cur.read_i64()?;

        let payload_len = cur.read_u32()? as usize;
        let payload = cur.read_bytes(payload_len)?.to_vec();

        let string_count = cur.read_u32()?;
        let mut string_data = Vec::with_capacity(string_count as usize);
        for _ in 0..string_count {
            let len = cur.read_u32()? as usize;
            let bytes = cur.read_bytes(len)?;
            let s = String::from_utf8(bytes.to_vec())
                .map_err(|e| crate::wire::WireError::Malformed(e.to_string()))?;
            string_data.push(s);
        }

        Ok(ActionMessage {
            action,
            message_id,
            source: GlobalHandle::new(GlobalFederateId::new(source_id), InterfaceHandle::from(source_handle as usize)),
            dest: GlobalHandle::new(GlobalFederateId::new(dest_id), InterfaceHandle::from(dest_handle as usize)),
            counter,
            flags: Flags::from_raw(flags),
            sequence_id,
            extra_data,
            extra_dest_data,
            action_time: Time::new(action_time),
            te: Time::new(te),
            tdemin: Time::new(tdemin),
            payload,
            string_data,
        })
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], crate::wire::WireError> {
        if self.pos + len > self.buf.len() {
            return Err(crate::wire::WireError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, crate::wire::WireError> {
        Ok(i32::from_be_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    fn read_u32(&mut self) -> Result<u32, crate::wire::WireError> {
        Ok(u32::from_be_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    fn read_i16(&mut self) -> Result<i16, crate::wire::WireError> {
        Ok(i16::from_be_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    fn read_u16(&mut self) -> Result<u16, crate::wire::WireError> {
        Ok(u16::from_be_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64, crate::wire::WireError> {
        Ok(i64::from_be_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_round_trips() {
        let mut msg = ActionMessage::new(ActionCode::SendMessage);
        msg.message_id = 7;
        msg.source = GlobalHandle::new(GlobalFederateId::new(3), InterfaceHandle::from(1usize));
        msg.dest = GlobalHandle::new(GlobalFederateId::new(9), InterfaceHandle::from(2usize));
        msg.counter = 1;
        msg.flags = Flags::empty().with(crate::flags::REQUIRED_FLAG);
        msg.action_time = Time::from_seconds(45.7);
        msg.payload = vec![1, 2, 3, 4, 5];
        msg.string_data = vec!["abc".into(), "def".into()];

        let body = msg.encode_body();
        let decoded = ActionMessage::decode_body(&body).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn multi_message_round_trips_binary_payloads() {
        let mut a = ActionMessage::new(ActionCode::Disconnect);
        a.source.fed_id = GlobalFederateId::new(1);
        a.dest.fed_id = GlobalFederateId::new(2);
        a.payload = vec![0xF3, 0xFA, 0xFC, 0x00, 0xFF];

        let mut b = ActionMessage::new(ActionCode::Disconnect);
        b.source.fed_id = GlobalFederateId::new(1);
        b.dest.fed_id = GlobalFederateId::new(3);

        let batch = ActionMessage::pack_multi_message(GlobalFederateId::new(1), &[a.clone(), b.clone()]).unwrap();
        assert_eq!(batch.action, ActionCode::MultiMessage);
        let unpacked = batch.unpack_multi_message().unwrap();
        assert_eq!(unpacked, vec![a, b]);
    }
}
