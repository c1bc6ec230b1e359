use bytes::Bytes;
use serde_json::json;

use crate::broker::{BrokerError, Message};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::ErrorCode;

#[test]
fn test_publish_frame_carries_base64_payload() {
    let msg = json!({
        "type": "publish",
        "topic": "news",
        "payload": "aGVsbG8="
    })
    .to_string();

    let parsed = ClientMessage::parse(&msg).unwrap();

    assert_eq!(
        parsed,
        ClientMessage::Publish {
            topic: "news".to_string(),
            payload: Bytes::from("hello"),
        }
    );
}

#[test]
fn test_binary_payload_survives_the_wire() {
    let payload = Bytes::from(vec![0u8, 159, 146, 150, 255]);
    let frame = ServerMessage::from(Message::with_timestamp("raw", payload.clone(), 42));

    let text = serde_json::to_string(&frame).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["type"], "message");
    assert_eq!(value["timestamp"], 42);

    match ServerMessage::parse(&text).unwrap() {
        ServerMessage::Message { payload: got, .. } => assert_eq!(got, payload),
        other => panic!("Expected a message frame, got {other:?}"),
    }
}

#[test]
fn test_subscribe_frame() {
    let msg = json!({ "type": "subscribe", "topic": "news" }).to_string();
    assert_eq!(
        ClientMessage::parse(&msg).unwrap(),
        ClientMessage::Subscribe {
            topic: "news".to_string()
        }
    );
}

#[test]
fn test_malformed_frames_are_rejected() {
    assert!(ClientMessage::parse("not json").is_err());
    assert!(ClientMessage::parse(&json!({ "type": "unsubscribe", "topic": "x" }).to_string()).is_err());
    assert!(
        ClientMessage::parse(
            &json!({ "type": "publish", "topic": "x", "payload": "%%%" }).to_string()
        )
        .is_err()
    );
}

#[test]
fn test_broker_errors_become_error_frames() {
    let frame = ServerMessage::from(&BrokerError::InvalidArgument("topic must not be empty"));
    let value = serde_json::to_value(&frame).unwrap();

    assert_eq!(
        value,
        json!({
            "type": "error",
            "code": "invalid_argument",
            "message": "invalid argument: topic must not be empty"
        })
    );
    assert_eq!(
        ServerMessage::from(&BrokerError::Unavailable),
        ServerMessage::error(ErrorCode::Unavailable, "broker is shutting down")
    );
}

#[test]
fn test_publish_response_frame() {
    let value = serde_json::to_value(ServerMessage::PublishResponse { success: true }).unwrap();
    assert_eq!(value, json!({ "type": "publish_response", "success": true }));
}
