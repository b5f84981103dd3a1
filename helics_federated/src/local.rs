//! In-process transport: connects two nodes in the same process over an
//! `mpsc` channel pair rather than a socket. Used for brokers and cores
//! that share a process (the common case for small federations and for
//! tests), keeping the exact same `ActionMessage` send/recv surface as
//! [`crate::tcp::TcpConnection`] so callers don't special-case it.

use helics_message::ActionMessage;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};

/// One end of an in-process connection. Cloning is not supported: each
/// side owns exactly one sender and one receiver, matching a socket's
/// single-reader/single-writer shape.
pub struct LocalEndpoint {
    tx: mpsc::UnboundedSender<ActionMessage>,
    rx: mpsc::UnboundedReceiver<ActionMessage>,
}

impl LocalEndpoint {
    /// Creates a connected pair: whatever is sent on one side arrives on
    /// the other's `recv`.
    pub fn pair() -> (LocalEndpoint, LocalEndpoint) {
        let (tx_a, rx_b) = mpsc::unbounded_channel();
        let (tx_b, rx_a) = mpsc::unbounded_channel();
        (LocalEndpoint { tx: tx_a, rx: rx_a }, LocalEndpoint { tx: tx_b, rx: rx_b })
    }

    pub fn send(&self, msg: ActionMessage) -> Result<()> {
        self.tx.send(msg).map_err(|_| TransportError::Closed)
    }

    pub async fn recv(&mut self) -> Result<Option<ActionMessage>> {
        Ok(self.rx.recv().await)
    }
}
