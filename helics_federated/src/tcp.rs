//! TCP transport between Cores and Brokers: an `ActionMessage` framed
//! directly over `tokio_util::codec::Framed`, one connection per peer.

use futures::{SinkExt, StreamExt};
use helics_message::wire::ActionMessageCodec;
use helics_message::ActionMessage;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::error::{Result, TransportError};

/// One established TCP connection to a peer, already speaking the
/// `ActionMessage` wire framing in both directions.
pub struct TcpConnection {
    framed: Framed<TcpStream, ActionMessageCodec>,
}

impl TcpConnection {
    /// Dials a peer broker/core at `addr`. Disables Nagle's algorithm:
    /// HELICS's priority channel depends on small control messages
    /// reaching the peer without batching delay.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let conn = TcpConnection { framed: Framed::new(stream, ActionMessageCodec) };
        tracing::debug!(peer = ?conn.peer_addr().ok(), "dialed peer connection");
        Ok(conn)
    }

    fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let conn = TcpConnection { framed: Framed::new(stream, ActionMessageCodec) };
        tracing::debug!(peer = ?conn.peer_addr().ok(), "accepted inbound connection");
        Ok(conn)
    }

    pub async fn send(&mut self, msg: ActionMessage) -> Result<()> {
        self.framed.send(msg).await.map_err(TransportError::from)
    }

    /// Awaits the next inbound message; `None` once the peer closes the
    /// connection cleanly.
    pub async fn recv(&mut self) -> Result<Option<ActionMessage>> {
        match self.framed.next().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(e)) => Err(TransportError::from(e)),
            None => Ok(None),
        }
    }

    pub fn peer_addr(&self) -> Result<std::net::SocketAddr> {
        self.framed.get_ref().peer_addr().map_err(TransportError::from)
    }
}

/// Accepts inbound connections on `addr`, handing each fully-framed
/// [`TcpConnection`] to the caller as it arrives. A Broker listens on one
/// of these per configured connection port; a Core accepting direct
/// broker-to-core links does the same.
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(TcpAcceptor { listener })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener.local_addr().map_err(TransportError::from)
    }

    pub async fn accept(&self) -> Result<TcpConnection> {
        let (stream, _peer) = self.listener.accept().await?;
        TcpConnection::from_stream(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::{GlobalFederateId, GlobalHandle, InterfaceHandle, Time};
    use helics_message::ActionCode;

    #[tokio::test]
    async fn a_message_sent_over_loopback_tcp_is_received_intact() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").await.unwrap();
        let addr = acceptor.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut conn = acceptor.accept().await.unwrap();
            conn.recv().await.unwrap().unwrap()
        });

        let mut client = TcpConnection::connect(addr).await.unwrap();
        let mut msg = ActionMessage::new(ActionCode::TimeRequest);
        msg.source = GlobalHandle::new(GlobalFederateId::new(1), InterfaceHandle::from(0usize));
        msg.action_time = Time::from_seconds(3.5);
        client.send(msg.clone()).await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn recv_returns_none_once_the_peer_disconnects() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").await.unwrap();
        let addr = acceptor.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut conn = acceptor.accept().await.unwrap();
            conn.recv().await.unwrap()
        });

        let client = TcpConnection::connect(addr).await.unwrap();
        drop(client);

        assert!(server.await.unwrap().is_none());
    }
}
