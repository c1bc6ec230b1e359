//! topicbus server
//!
//! Loads configuration, starts the WebSocket listener and serves until
//! Ctrl-C, then shuts the broker down so open subscribe streams are told.

use clap::Parser;
use tracing::{error, info, warn};

use topicbus::broker::{Broker, BrokerConfig};
use topicbus::config::{Settings, load_config};
use topicbus::transport::websocket::{ServerOptions, bind, serve};
use topicbus::utils::logging;

#[derive(Parser)]
#[command(name = "topicbus", about = "In-memory topic publish/subscribe broker")]
struct Args {
    /// Interface to bind (overrides configuration)
    #[arg(long)]
    host: Option<String>,
    /// The server port (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let (mut settings, config_error) = match load_config() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    logging::init(&settings.logging.level);
    if let Some(e) = config_error {
        warn!("Failed to load configuration, using defaults: {e}");
    }

    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    if let Err(e) = run_server(settings).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = settings.server.addr();
    let broker = Broker::with_config(BrokerConfig::from(&settings.broker));
    let listener = bind(&addr).await?;

    info!("Starting server on ws://{addr}");

    tokio::select! {
        _ = serve(listener, broker.clone(), ServerOptions::from(&settings)) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    broker.shutdown().await;
    Ok(())
}
