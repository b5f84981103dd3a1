//! The standalone broker process: accepts Core connections over TCP,
//! assigns each a federation-wide id, and routes `ActionMessage` traffic
//! between them per the tree topology in spec §4.1/§4.3.

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use helics::{ActionMessage, Broker, GlobalFederateId};
use helics_federated::{TcpAcceptor, TcpConnection};
use tokio::sync::{mpsc, Mutex};

/// Per-connection outbound channels, keyed by the child id the broker
/// assigned at registration. Owned outside [`Broker`] itself: the library
/// tracks federation topology, not live sockets.
type Routes = Arc<Mutex<HashMap<GlobalFederateId, mpsc::UnboundedSender<ActionMessage>>>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = helics::Cli::parse();
    let config = cli.resolve()?;
    helics::logging::init(config.log_level.as_deref().unwrap_or("info"));

    let name = config.name.clone().unwrap_or_else(|| "broker".to_string());
    let port = config.port.unwrap_or(0);
    let bind_addr = if config.ipv4.unwrap_or(false) { format!("0.0.0.0:{port}") } else { format!("[::]:{port}") };

    let broker = Arc::new(Mutex::new(Broker::new_root(name.clone())));
    let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

    let acceptor = TcpAcceptor::bind(&bind_addr).await?;
    tracing::info!(addr = %acceptor.local_addr()?, %name, "broker listening");

    loop {
        let conn = acceptor.accept().await?;
        let broker = broker.clone();
        let routes = routes.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_connection(conn, broker, routes).await {
                tracing::warn!(?err, "core connection ended");
            }
        });
    }
}

async fn serve_connection(mut conn: TcpConnection, broker: Arc<Mutex<Broker>>, routes: Routes) -> anyhow::Result<()> {
    let peer = conn.peer_addr()?;
    let child_id = {
        let mut broker = broker.lock().await;
        broker.register_child(peer.to_string(), false)?
    };
    tracing::info!(%peer, ?child_id, "core connected");

    let (tx, mut rx) = mpsc::unbounded_channel::<ActionMessage>();
    routes.lock().await.insert(child_id, tx);

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                match inbound? {
                    Some(msg) => {
                        let outbound = broker.lock().await.route(msg);
                        for out in outbound {
                            let dest = out.dest.fed_id;
                            if let Some(sender) = routes.lock().await.get(&dest) {
                                let _ = sender.send(out);
                            }
                        }
                    }
                    None => break,
                }
            }
            Some(msg) = rx.recv() => {
                conn.send(msg).await?;
            }
        }
    }

    routes.lock().await.remove(&child_id);
    Ok(())
}
