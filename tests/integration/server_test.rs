//! Integration tests for the WebSocket control server

use crate::test_utils::Fixture;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("Failed to connect to control server");
    client
}

async fn send(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string()))
        .await
        .expect("Failed to send request");
}

/// Next JSON message, skipping non-text frames.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for server message")
            .expect("Connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("Server sent invalid JSON");
        }
    }
}

/// Reads until a message of `kind` arrives, returning it and everything skipped.
async fn next_of_type(client: &mut Client, kind: &str) -> (Value, Vec<Value>) {
    let mut skipped = Vec::new();
    loop {
        let message = next_json(client).await;
        if message["type"] == kind {
            return (message, skipped);
        }
        skipped.push(message);
    }
}

#[cfg(test)]
mod server_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_play_reports_feedback_then_result() {
        let fixture = Fixture::new("sleep", 20.0);
        let mut client = connect(fixture.serve().await).await;

        send(&mut client, json!({"type": "Play", "filePath": "0.4"})).await;
        let (result, earlier) = next_of_type(&mut client, "Result").await;

        assert_eq!(result["success"], true);
        assert!(result["totalTime"].as_f64().unwrap() >= 0.4);
        let feedback: Vec<f64> = earlier
            .iter()
            .filter(|m| m["type"] == "Feedback")
            .map(|m| m["elapsedSeconds"].as_f64().unwrap())
            .collect();
        assert!(!feedback.is_empty());
        assert!(feedback.windows(2).all(|pair| pair[0] <= pair[1]));
        fixture.shutdown.trigger();
    }

    #[tokio::test]
    async fn test_cancel_preempts_play() {
        let fixture = Fixture::new("sleep", 20.0);
        let mut client = connect(fixture.serve().await).await;

        send(&mut client, json!({"type": "Play", "filePath": "30"})).await;
        next_of_type(&mut client, "Feedback").await;
        send(&mut client, json!({"type": "Cancel"})).await;

        let (result, _) = next_of_type(&mut client, "Result").await;
        assert_eq!(result, json!({"type": "Result", "success": false, "preempted": true}));
        fixture.shutdown.trigger();
    }

    #[tokio::test]
    async fn test_failed_play_carries_reason() {
        let fixture = Fixture::new("echo nope >&2; false", 20.0);
        let mut client = connect(fixture.serve().await).await;

        send(&mut client, json!({"type": "Play", "filePath": "x.wav"})).await;
        let (result, _) = next_of_type(&mut client, "Result").await;
        assert_eq!(result["success"], false);
        assert_eq!(result["preempted"], false);
        assert!(result["reason"].as_str().unwrap().starts_with("stderr: nope"));
        fixture.shutdown.trigger();
    }

    #[tokio::test]
    async fn test_volume_subscription_is_latched_and_gated() {
        let fixture = Fixture::new("sleep", 20.0);
        fixture.telemetry.refresh().await;
        let addr = fixture.serve().await;
        let mut first = connect(addr).await;
        let mut second = connect(addr).await;

        send(&mut first, json!({"type": "SubscribeVolume"})).await;
        let (latched, _) = next_of_type(&mut first, "Volume").await;
        assert_eq!(latched["percent"], 51);

        send(&mut second, json!({"type": "SubscribeVolume"})).await;
        next_of_type(&mut second, "Volume").await;
        assert!(fixture.telemetry.is_polling());
        assert_eq!(fixture.telemetry.listener_count(), 2);

        send(&mut first, json!({"type": "UnsubscribeVolume"})).await;
        second.close(None).await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while fixture.telemetry.is_polling() {
            assert!(tokio::time::Instant::now() < deadline, "polling never disabled");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(fixture.telemetry.listener_count(), 0);
        fixture.shutdown.trigger();
    }

    #[tokio::test]
    async fn test_get_volume_and_invalid_requests() {
        let fixture = Fixture::new("sleep", 20.0);
        let mut client = connect(fixture.serve().await).await;

        send(&mut client, json!({"type": "GetVolume"})).await;
        let (volume, _) = next_of_type(&mut client, "Volume").await;
        assert_eq!(volume["percent"], 51);

        send(&mut client, json!({"type": "Rewind"})).await;
        let (error, _) = next_of_type(&mut client, "Error").await;
        assert!(error["message"].as_str().unwrap().starts_with("Invalid request"));

        send(&mut client, json!({"type": "Cancel"})).await;
        let (error, _) = next_of_type(&mut client, "Error").await;
        assert_eq!(error["message"], "Nothing is playing");
        fixture.shutdown.trigger();
    }

    #[tokio::test]
    async fn test_cancel_right_after_play_is_never_lost() {
        let fixture = Fixture::new("sleep", 20.0);
        let mut client = connect(fixture.serve().await).await;

        for _ in 0..5 {
            send(&mut client, json!({"type": "Play", "filePath": "30"})).await;
            send(&mut client, json!({"type": "Cancel"})).await;
            let (result, skipped) = next_of_type(&mut client, "Result").await;
            assert_eq!(result["preempted"], true);
            assert!(skipped.iter().all(|m| m["type"] != "Error"), "{:?}", skipped);
        }
        fixture.shutdown.trigger();
    }

    #[tokio::test]
    async fn test_get_volume_while_subscribed_sends_one_reading() {
        let fixture = Fixture::with_volume_poll("sleep", 20.0, Duration::from_secs(60));
        let mut client = connect(fixture.serve().await).await;

        // Nothing latched yet: the only reading is the ticker's first tick
        send(&mut client, json!({"type": "SubscribeVolume"})).await;
        next_of_type(&mut client, "Volume").await;

        send(&mut client, json!({"type": "GetVolume"})).await;
        let (volume, _) = next_of_type(&mut client, "Volume").await;
        assert_eq!(volume["percent"], 51);

        tokio::time::sleep(Duration::from_millis(300)).await;
        send(&mut client, json!({"type": "Cancel"})).await;
        let next = next_json(&mut client).await;
        assert_eq!(next["type"], "Error", "duplicate reading: {}", next);
        fixture.shutdown.trigger();
    }
}
