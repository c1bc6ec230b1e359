//! Command line subscriber.
//!
//! `subscriber subscribe --topic news` prints `<topic>: <payload>` for every
//! message until the stream ends or Ctrl-C.

use clap::{Parser, Subcommand};
use futures_util::StreamExt;

use topicbus::client::BrokerClient;
use topicbus::utils::logging;

#[derive(Parser)]
#[command(name = "subscriber", about = "A client for subscribing to a pubsub topic")]
struct Cli {
    /// The server address in the format of host:port
    #[arg(long, global = true, env = "TOPICBUS_ADDR", default_value = "localhost:50051")]
    addr: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe to a topic
    #[command(visible_aliases = ["sub", "s"])]
    Subscribe {
        /// Topic to subscribe to
        #[arg(short, long)]
        topic: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init("warn");

    match cli.command {
        Command::Subscribe { topic } => {
            tokio::select! {
                _ = subscribe(&cli.addr, &topic) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
    }
}

async fn subscribe(addr: &str, topic: &str) {
    let client = match BrokerClient::new(addr) {
        Ok(client) => client,
        Err(e) => {
            println!("{e}");
            return;
        }
    };

    let mut stream = match client.subscribe(topic).await {
        Ok(stream) => stream,
        Err(e) => {
            println!("{e}");
            return;
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(message) => println!(
                "{}: {}",
                message.topic(),
                String::from_utf8_lossy(message.payload())
            ),
            Err(e) => println!("{e}"),
        }
    }
}
