//! Stream framing for [`ActionMessage`]: the `0xF3 len[3] body 0xFA 0xFC`
//! envelope, and a [`tokio_util::codec`] adapter over it.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::message::ActionMessage;
use crate::message::{FRAME_END, FRAME_START};

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("frame body exceeds the 3-byte length prefix's 16MB limit")]
    TooLarge,
    #[error("malformed frame: expected sentinel 0x{FRAME_START:02x}, found 0x{0:02x}")]
    BadSentinel(u8),
    #[error("malformed frame: bad tail bytes")]
    BadTail,
    #[error("truncated frame body")]
    Truncated,
    #[error("malformed body: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serialize a message into its framed wire representation.
///
/// `0xF3 | len[23:16] | len[15:8] | len[7:0] | body | 0xFA | 0xFC`
pub fn packetize(msg: &ActionMessage) -> Result<Vec<u8>, WireError> {
    let body = msg.encode_body();
    if body.len() > 0xFF_FFFF {
        return Err(WireError::TooLarge);
    }
    let len = body.len() as u32;
    let mut out = Vec::with_capacity(1 + 3 + body.len() + 2);
    out.push(FRAME_START);
    out.push(((len >> 16) & 0xFF) as u8);
    out.push(((len >> 8) & 0xFF) as u8);
    out.push((len & 0xFF) as u8);
    out.extend_from_slice(&body);
    out.extend_from_slice(&FRAME_END);
    Ok(out)
}

/// Parse exactly one framed message from the start of `buf`, returning the
/// message and the number of bytes consumed.
pub fn depacketize(buf: &[u8]) -> Result<Option<(ActionMessage, usize)>, WireError> {
    if buf.is_empty() {
        return Ok(None);
    }
    if buf[0] != FRAME_START {
        tracing::warn!(byte = buf[0], "bad frame sentinel on inbound stream");
        return Err(WireError::BadSentinel(buf[0]));
    }
    if buf.len() < 4 {
        return Ok(None);
    }
    let len = ((buf[1] as u32) << 16) | ((buf[2] as u32) << 8) | (buf[3] as u32);
    let total = 4 + len as usize + 2;
    if buf.len() < total {
        return Ok(None);
    }
    let body = &buf[4..4 + len as usize];
    let tail = &buf[4 + len as usize..total];
    if tail != FRAME_END {
        tracing::warn!("bad frame tail on inbound stream, discarding frame boundary");
        return Err(WireError::BadTail);
    }
    let msg = ActionMessage::decode_body(body)?;
    Ok(Some((msg, total)))
}

/// A [`tokio_util::codec`] codec that frames [`ActionMessage`]s over any
/// `AsyncRead`/`AsyncWrite` stream using [`packetize`]/[`depacketize`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionMessageCodec;

impl Decoder for ActionMessageCodec {
    type Item = ActionMessage;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match depacketize(src)? {
            Some((msg, consumed)) => {
                src.advance(consumed);
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<ActionMessage> for ActionMessageCodec {
    type Error = WireError;

    fn encode(&mut self, item: ActionMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let framed = packetize(&item)?;
        dst.reserve(framed.len());
        dst.put_slice(&framed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionCode;
    use crate::flags::Flags;
    use helics_core::{GlobalFederateId, GlobalHandle, InterfaceHandle, Time};

    fn sample() -> ActionMessage {
        let mut msg = ActionMessage::new(ActionCode::SendMessage);
        msg.action_time = Time::from_seconds(45.7);
        msg.source = GlobalHandle::new(GlobalFederateId::new(1), InterfaceHandle::from(0usize));
        msg.dest = GlobalHandle::new(GlobalFederateId::new(2), InterfaceHandle::from(1usize));
        msg.payload = vec![0xAB; 500_000];
        msg.string_data = vec!["a".repeat(50), "b".repeat(50), "c".repeat(50)];
        msg.flags = Flags::empty()
            .with(crate::flags::ITERATION_REQUESTED_FLAG)
            .with(crate::flags::REQUIRED_FLAG)
            .with(crate::flags::ERROR_FLAG);
        msg
    }

    #[test]
    fn packetize_depacketize_round_trips_large_message() {
        let msg = sample();
        let framed = packetize(&msg).unwrap();
        let (decoded, consumed) = depacketize(&framed).unwrap().unwrap();
        assert_eq!(consumed, framed.len());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn depacketize_reports_incomplete_frame() {
        let msg = sample();
        let framed = packetize(&msg).unwrap();
        let partial = &framed[..framed.len() - 1];
        assert!(depacketize(partial).unwrap().is_none());
    }

    #[test]
    fn codec_round_trips_through_bytesmut() {
        let mut codec = ActionMessageCodec;
        let mut buf = BytesMut::new();
        let msg = sample();
        codec.encode(msg.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, msg);
        assert!(buf.is_empty());
    }
}
