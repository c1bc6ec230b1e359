//! Broker client
//!
//! Each call opens its own WebSocket connection, the same way each RPC is its
//! own stream. `publish` waits for the broker's answer under a short timeout.
//! `subscribe` hands back a `MessageStream` that yields until the connection
//! ends; it has no timeout and cannot be restarted once finished.

use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Message;
use crate::client::error::ClientError;
use crate::transport::message::{ClientMessage, ServerMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct BrokerClient {
    url: String,
    publish_timeout: Duration,
}

impl BrokerClient {
    pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

    /// Accepts `host:port` or a full `ws://` / `wss://` URL.
    pub fn new(addr: &str) -> Result<Self, ClientError> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(ClientError::InvalidAddress(addr.to_string()));
        }

        let url = if addr.starts_with("ws://") || addr.starts_with("wss://") {
            addr.to_string()
        } else if addr.contains("://") {
            return Err(ClientError::InvalidAddress(addr.to_string()));
        } else {
            format!("ws://{addr}")
        };

        Ok(Self {
            url,
            publish_timeout: Self::DEFAULT_PUBLISH_TIMEOUT,
        })
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn publish_timeout(&self) -> Duration {
        self.publish_timeout
    }

    /// Publish `payload` to `topic`. Success means the broker accepted the
    /// message, not that any subscriber received it.
    pub async fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> Result<(), ClientError> {
        let request = ClientMessage::Publish {
            topic: topic.to_string(),
            payload: payload.into(),
        };

        tokio::time::timeout(self.publish_timeout, self.call(request))
            .await
            .map_err(|_| ClientError::Timeout(self.publish_timeout))?
    }

    async fn call(&self, request: ClientMessage) -> Result<(), ClientError> {
        let mut socket = self.connect().await?;
        socket.send(request.to_frame()?).await?;

        let result = loop {
            match socket.next().await {
                Some(Ok(WsMessage::Text(text))) => match ServerMessage::parse(text.as_str())? {
                    ServerMessage::PublishResponse { success: true } => break Ok(()),
                    ServerMessage::PublishResponse { success: false } => {
                        break Err(ClientError::PublishFailed);
                    }
                    ServerMessage::Error { code, message } => {
                        break Err(ClientError::from_status(code, message));
                    }
                    ServerMessage::Message { .. } => {
                        break Err(ClientError::Protocol(
                            "message frame in reply to publish".to_string(),
                        ));
                    }
                },
                Some(Ok(WsMessage::Close(_))) | None => break Err(ClientError::ConnectionClosed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => break Err(e.into()),
            }
        };

        if let Err(e) = socket.close(None).await {
            debug!("closing publish connection failed: {e}");
        }
        result
    }

    /// Open a subscribe stream for `topic`. Connection failures are returned
    /// here; a rejected request (for example an empty topic) arrives as the
    /// stream's first item.
    pub async fn subscribe(&self, topic: &str) -> Result<MessageStream, ClientError> {
        let mut socket = self.connect().await?;
        let request = ClientMessage::Subscribe {
            topic: topic.to_string(),
        };
        socket.send(request.to_frame()?).await?;

        Ok(MessageStream {
            topic: topic.to_string(),
            socket,
            finished: false,
        })
    }

    async fn connect(&self) -> Result<Socket, ClientError> {
        let (socket, _response) = connect_async(self.url.as_str()).await?;
        Ok(socket)
    }
}

/// Messages received on one subscription.
///
/// Ends with `None` when the broker closes the stream. Server-side
/// termination reasons (shutdown, expiry, rejection) surface as one final
/// `Err` before the end.
#[derive(Debug)]
pub struct MessageStream {
    topic: String,
    socket: Socket,
    finished: bool,
}

impl MessageStream {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Close the underlying connection, which ends the subscription on the
    /// broker.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.finished = true;
        self.socket.close(None).await?;
        Ok(())
    }
}

impl Stream for MessageStream {
    type Item = Result<Message, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            let frame = ready!(this.socket.poll_next_unpin(cx));
            let item = match frame {
                Some(Ok(WsMessage::Text(text))) => match ServerMessage::parse(text.as_str()) {
                    Ok(ServerMessage::Message {
                        topic,
                        payload,
                        timestamp,
                    }) => return Poll::Ready(Some(Ok(Message::with_timestamp(topic, payload, timestamp)))),
                    Ok(ServerMessage::Error { code, message }) => {
                        Err(ClientError::from_status(code, message))
                    }
                    Ok(ServerMessage::PublishResponse { .. }) => Err(ClientError::Protocol(
                        "publish response on a subscribe stream".to_string(),
                    )),
                    Err(e) => Err(ClientError::Frame(e)),
                },
                Some(Ok(WsMessage::Close(_))) | None => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => Err(ClientError::Transport(e)),
            };

            this.finished = true;
            return Poll::Ready(Some(item));
        }
    }
}
