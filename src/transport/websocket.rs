//! WebSocket transport
//!
//! This file implements the WebSocket server that translates protocol JSON
//! frames into broker operations. Responsibilities:
//! - Accept TCP/WebSocket connections, one task per connection
//! - Answer each `publish` frame with a `publish_response` or an `error`
//! - Turn a `subscribe` frame into a server stream and run its serving loop
//!   until the client goes away, the broker shuts down or the optional
//!   subscription ttl elapses
//!
//! The serving loop owns the `Subscription`; returning from it drops the
//! subscription and with it the registry entry.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{Broker, Subscription};
use crate::config::Settings;
use crate::transport::error::{Result, TransportError};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::ErrorCode;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Hard upper bound on a subscribe stream's lifetime.
    pub subscription_ttl: Option<Duration>,
}

impl From<&Settings> for ServerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            subscription_ttl: settings.broker.subscription_ttl(),
        }
    }
}

/// Why a subscribe stream ended without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    ClientClosed,
    Shutdown,
    Expired,
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accept connections on `listener` until the broker shuts down.
pub async fn serve(listener: TcpListener, broker: Broker, options: ServerOptions) {
    let shutdown = broker.shutdown_token();

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Failed to accept connection: {e}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
        };

        tokio::spawn(handle_connection(stream, peer, broker.clone(), options.clone()));
    }

    debug!("listener stopped");
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, broker: Broker, options: ServerOptions) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {peer}: {e}");
            return;
        }
    };
    let (mut sink, mut source) = ws_stream.split();
    let shutdown = broker.shutdown_token();

    debug!(%peer, "connection opened");

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = source.next() => frame,
        };

        let text = match frame {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!(%peer, "read failed: {e}");
                break;
            }
        };

        let request = match ClientMessage::parse(text.as_str()) {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    "Invalid client message from {peer}: {err} | {}",
                    text.as_str().chars().take(100).collect::<String>()
                );
                let reply = ServerMessage::error(
                    ErrorCode::InvalidArgument,
                    format!("malformed request: {err}"),
                );
                if send(&mut sink, &reply).await.is_err() {
                    break;
                }
                continue;
            }
        };

        match request {
            ClientMessage::Publish { topic, payload } => {
                let reply = match broker.publish(&topic, payload) {
                    Ok(_) => ServerMessage::PublishResponse { success: true },
                    Err(err) => {
                        debug!(%peer, topic = %topic, "publish rejected: {err}");
                        ServerMessage::from(&err)
                    }
                };
                if let Err(e) = send(&mut sink, &reply).await {
                    debug!(%peer, "failed to answer publish: {e}");
                    break;
                }
            }
            ClientMessage::Subscribe { topic } => {
                match broker.subscribe(&topic) {
                    Ok(subscription) => {
                        info!(%peer, topic = %topic, "subscriber connected");
                        let ended = serve_subscription(
                            subscription,
                            &mut sink,
                            &mut source,
                            &shutdown,
                            options.subscription_ttl,
                        )
                        .await;
                        match ended {
                            Ok(end) => info!(%peer, topic = %topic, ?end, "subscriber stream ended"),
                            Err(e) => warn!(%peer, topic = %topic, "subscriber stream failed: {e}"),
                        }
                    }
                    Err(err) => {
                        debug!(%peer, topic = %topic, "subscribe rejected: {err}");
                        let _ = send(&mut sink, &ServerMessage::from(&err)).await;
                    }
                }
                // A subscribe call owns the rest of the connection.
                break;
            }
        }
    }

    let _ = sink.close().await;
    debug!(%peer, "connection closed");
}

/// Relay `subscription` onto `sink` until the stream terminates.
///
/// Waits concurrently on the subscription channel, the inbound half of the
/// connection (a close frame, end of stream or read error is a client
/// cancellation), the broker's shutdown token and the optional ttl. A failed
/// outbound send ends the loop with that error. Either way the subscription
/// is dropped, and thereby unregistered, before this returns.
pub async fn serve_subscription<Si, St>(
    mut subscription: Subscription,
    sink: &mut Si,
    source: &mut St,
    shutdown: &CancellationToken,
    ttl: Option<Duration>,
) -> Result<StreamEnd>
where
    Si: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    St: Stream<Item = std::result::Result<WsMessage, tungstenite::Error>> + Unpin,
{
    let expiry = async move {
        match ttl {
            Some(ttl) => tokio::time::sleep(ttl).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            message = subscription.recv() => {
                let Some(message) = message else {
                    // The broker dropped our sender, which only happens on shutdown.
                    let _ = send(&mut *sink, &shutting_down()).await;
                    return Ok(StreamEnd::Shutdown);
                };
                send(&mut *sink, &ServerMessage::from(message)).await?;
            }
            inbound = source.next() => match inbound {
                Some(Ok(WsMessage::Close(_))) | None => return Ok(StreamEnd::ClientClosed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = shutdown.cancelled() => {
                let _ = send(&mut *sink, &shutting_down()).await;
                return Ok(StreamEnd::Shutdown);
            }
            _ = &mut expiry => {
                let _ = send(
                    &mut *sink,
                    &ServerMessage::error(ErrorCode::Cancelled, "subscription expired"),
                )
                .await;
                return Ok(StreamEnd::Expired);
            }
        }
    }
}

fn shutting_down() -> ServerMessage {
    ServerMessage::error(ErrorCode::Unavailable, "broker is shutting down")
}

async fn send<S>(sink: &mut S, message: &ServerMessage) -> Result<()>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    sink.send(message.to_frame()?).await?;
    Ok(())
}
