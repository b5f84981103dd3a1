//! The standalone core process: hosts `--federates N` local federates,
//! connects upstream to a broker over TCP, and bridges the core's
//! in-process [`helics_runtime::ActionBus`] onto that connection.

use std::sync::{Arc, Mutex};

use clap::Parser;
use helics::{ActionMessage, Core, CoordinatorVariant, GlobalFederateId};
use helics_federated::TcpConnection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = helics::Cli::parse();
    let config = cli.resolve()?;
    helics::logging::init(config.log_level.as_deref().unwrap_or("info"));

    let name = config.name.clone().unwrap_or_else(|| "core".to_string());
    let broker_addr = config
        .broker_address
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--broker_address is required to join a federation"))?;

    let mut conn = TcpConnection::connect(&broker_addr).await?;
    tracing::info!(%name, %broker_addr, "connected to broker");

    let core = Arc::new(Mutex::new(Core::new(GlobalFederateId::new(0), name.clone(), helics_runtime::ActionBus::new())));

    let federate_count = config.federates.unwrap_or(1);
    {
        let mut core = core.lock().unwrap();
        for i in 0..federate_count {
            let fed_name = format!("{name}_fed{i}");
            core.register_federate(fed_name, CoordinatorVariant::Distributed { restrictive_time_policy: false });
        }
        core.enter_initializing_mode()?;
    }

    let upstream = {
        let core = core.lock().unwrap();
        core.upstream.clone()
    };

    loop {
        tokio::select! {
            outbound = fetch_outbound(upstream.clone()) => {
                if let Some(msg) = outbound {
                    conn.send(msg).await?;
                } else {
                    break;
                }
            }
            inbound = conn.recv() => {
                match inbound? {
                    Some(msg) => {
                        let mut core = core.lock().unwrap();
                        let _ = core.route(msg);
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}

/// Bridges the std-blocking [`helics_runtime::ActionBus`] onto an async
/// context: parks a blocking-pool thread in `recv` and resolves once a
/// message (or closure) arrives.
async fn fetch_outbound(bus: helics_runtime::ActionBus) -> Option<ActionMessage> {
    tokio::task::spawn_blocking(move || bus.recv()).await.unwrap_or(None)
}
