use std::time::Duration;

use tokio::net::TcpListener;

use super::{BrokerClient, ClientError};
use crate::utils::ErrorCode;

#[test]
fn test_client_new_normalizes_address() {
    let client = BrokerClient::new("localhost:50051").unwrap();
    assert_eq!(client.url(), "ws://localhost:50051");
    assert_eq!(client.publish_timeout(), BrokerClient::DEFAULT_PUBLISH_TIMEOUT);

    let client = BrokerClient::new("ws://10.0.0.1:9000").unwrap();
    assert_eq!(client.url(), "ws://10.0.0.1:9000");
}

#[test]
fn test_client_new_rejects_bad_address() {
    assert!(matches!(
        BrokerClient::new("   "),
        Err(ClientError::InvalidAddress(_))
    ));
    assert!(matches!(
        BrokerClient::new("http://localhost:50051"),
        Err(ClientError::InvalidAddress(_))
    ));
}

#[test]
fn test_status_mapping() {
    let err = ClientError::from_status(ErrorCode::InvalidArgument, "topic must not be empty".into());
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
    assert_eq!(err.to_string(), "invalid_argument: topic must not be empty");

    let err = ClientError::from_status(ErrorCode::Cancelled, "subscription expired".into());
    assert!(matches!(err, ClientError::Cancelled(_)));
    assert_eq!(ClientError::ConnectionClosed.code(), ErrorCode::Unavailable);
}

#[tokio::test]
async fn test_publish_times_out_when_broker_never_answers() {
    // Accepts TCP but never completes the WebSocket handshake.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let client = BrokerClient::new(&addr.to_string())
        .unwrap()
        .with_publish_timeout(Duration::from_millis(100));

    let err = client.publish("news", "hello").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
}

#[tokio::test]
async fn test_connection_refused_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BrokerClient::new(&addr.to_string()).unwrap();

    let err = client.subscribe("news").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(err.code(), ErrorCode::Unavailable);
}
