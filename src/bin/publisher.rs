//! Command line publisher.
//!
//! `publisher publish --topic news "hello"` sends one message and prints the
//! outcome. Broker-side failures are printed, not turned into an exit code.

use clap::{Parser, Subcommand};

use topicbus::client::BrokerClient;
use topicbus::config::load_config;
use topicbus::utils::logging;

#[derive(Parser)]
#[command(
    name = "publisher",
    about = "A command line tool for publishing messages to a pubsub topic"
)]
struct Cli {
    /// The server address in the format of host:port
    #[arg(long, global = true, env = "TOPICBUS_ADDR", default_value = "localhost:50051")]
    addr: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a message to a topic
    #[command(visible_aliases = ["pub", "p"])]
    Publish {
        /// Topic to publish to
        #[arg(short, long)]
        topic: String,
        /// Message to publish
        message: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = load_config().unwrap_or_default();
    logging::init("warn");

    match cli.command {
        Command::Publish { topic, message } => {
            let client = match BrokerClient::new(&cli.addr) {
                Ok(client) => client.with_publish_timeout(settings.client.publish_timeout()),
                Err(e) => {
                    println!("publish failed: {e}");
                    return;
                }
            };

            match client.publish(&topic, message).await {
                Ok(()) => println!("published to {topic}"),
                Err(e) => println!("publish failed: {e}"),
            }
        }
    }
}
