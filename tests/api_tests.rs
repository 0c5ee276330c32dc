//! End-to-end tests over a real listener.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use olimpico_gateway::api;
use olimpico_gateway::app_state::AppState;
use olimpico_gateway::config::GatewayConfig;
use olimpico_gateway::domain::{Clock, SystemClock};
use serde_json::{Value, json};

async fn spawn_server() -> (SocketAddr, AppState) {
    let Ok(config) = GatewayConfig::from_lookup(|key| match key {
        "LISTEN_ADDR" => Some("127.0.0.1:0".to_string()),
        "KEEPALIVE_INTERVAL_SECS" => Some("1".to_string()),
        _ => None,
    }) else {
        panic!("config must parse");
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::from_config(&config, clock);
    let app = api::build_app(state.clone());

    let Ok(listener) = tokio::net::TcpListener::bind(config.listen_addr).await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

/// Reads SSE frames until `n` complete `data:` payloads have arrived.
async fn read_frames(response: &mut reqwest::Response, buffer: &mut String, n: usize) -> Vec<Value> {
    let mut frames = Vec::new();
    while frames.len() < n {
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    frames.push(serde_json::from_str(data.trim()).unwrap_or(Value::Null));
                }
            }
        }
        if frames.len() >= n {
            break;
        }
        let next = tokio::time::timeout(Duration::from_secs(5), response.chunk()).await;
        let Ok(Ok(Some(bytes))) = next else {
            panic!("stream ended or timed out after {} frames", frames.len());
        };
        buffer.push_str(&String::from_utf8_lossy(&bytes));
    }
    frames
}

#[tokio::test]
async fn scan_event_flows_to_state_stream() {
    let (addr, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    let Ok(mut stream) = client.get(format!("http://{addr}/api/stream")).send().await else {
        panic!("stream request failed");
    };
    let mut buffer = String::new();
    let opening = read_frames(&mut stream, &mut buffer, 2).await;
    assert_eq!(opening[0], json!({"type": "connected"}));
    assert_eq!(opening[1]["type"], "state");
    assert_eq!(opening[1]["data"]["activeUsers"], 0);

    let Ok(ack) = client
        .post(format!("http://{addr}/api/events"))
        .json(&json!({"language": "es", "hour": 22, "deviceType": "mobile", "motion": 0.8}))
        .send()
        .await
    else {
        panic!("event post failed");
    };
    assert_eq!(ack.status(), reqwest::StatusCode::OK);

    let update = read_frames(&mut stream, &mut buffer, 1).await;
    assert_eq!(update[0]["type"], "state");
    assert_eq!(update[0]["data"]["activeUsers"], 1);
    assert_eq!(update[0]["data"]["languages"], json!(["es"]));
    assert_eq!(update[0]["data"]["averageHour"], 22.0);
}

#[tokio::test]
async fn idle_state_stream_pings() {
    let (addr, _state) = spawn_server().await;
    let Ok(mut stream) = reqwest::get(format!("http://{addr}/api/stream")).await else {
        panic!("stream request failed");
    };
    let mut buffer = String::new();
    let frames = read_frames(&mut stream, &mut buffer, 3).await;
    assert_eq!(frames[2], json!({"type": "ping"}));
}

#[tokio::test]
async fn disconnect_releases_subscription() {
    let (addr, state) = spawn_server().await;
    let Ok(mut stream) = reqwest::get(format!("http://{addr}/api/stream")).await else {
        panic!("stream request failed");
    };
    let mut buffer = String::new();
    let _ = read_frames(&mut stream, &mut buffer, 2).await;
    assert_eq!(state.service.events().subscriber_count(), 1);

    drop(stream);
    let mut released = false;
    for _ in 0..100 {
        if state.service.events().subscriber_count() == 0 {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(released, "subscription still registered after disconnect");
}

#[tokio::test]
async fn phone_updates_merge_and_stream() {
    let (addr, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    let first = json!({"id": "p1", "name": "Ana", "gyroscope": {"alpha": 10.0, "beta": 5.0, "gamma": 0.0}});
    let Ok(created) = client.post(format!("http://{addr}/api/phone")).json(&first).send().await else {
        panic!("phone post failed");
    };
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);

    let second = json!({"id": "p1", "gyroscope": {"alpha": 20.0, "beta": 5.0, "gamma": 0.0}});
    let Ok(updated) = client.post(format!("http://{addr}/api/phone")).json(&second).send().await else {
        panic!("phone post failed");
    };
    assert_eq!(updated.status(), reqwest::StatusCode::OK);

    let Ok(record) = client.get(format!("http://{addr}/api/phone/p1")).send().await else {
        panic!("phone get failed");
    };
    let record: Value = record.json().await.unwrap_or(Value::Null);
    assert_eq!(record["name"], "Ana");
    assert_eq!(record["gyroscope"]["alpha"], 20.0);

    let Ok(mut stream) = client.get(format!("http://{addr}/api/phones/stream")).send().await else {
        panic!("phone stream request failed");
    };
    let mut buffer = String::new();
    let frames = read_frames(&mut stream, &mut buffer, 2).await;
    assert_eq!(frames[0]["type"], "connected");
    assert_eq!(frames[1]["type"], "phones");
    assert_eq!(frames[1]["activePhones"], 1);
    assert_eq!(frames[1]["phones"][0]["id"], "p1");
}

#[tokio::test]
async fn reset_clears_everything() {
    let (addr, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    let _ = client
        .post(format!("http://{addr}/api/events"))
        .json(&json!({"language": "en", "hour": 9, "deviceType": "tablet"}))
        .send()
        .await;
    let _ = client
        .post(format!("http://{addr}/api/phone"))
        .json(&json!({"id": "p1"}))
        .send()
        .await;

    let Ok(reset) = client.post(format!("http://{addr}/api/reset")).send().await else {
        panic!("reset failed");
    };
    assert_eq!(reset.status(), reqwest::StatusCode::OK);

    let Ok(state) = client.get(format!("http://{addr}/api/state")).send().await else {
        panic!("state failed");
    };
    let state: Value = state.json().await.unwrap_or(Value::Null);
    assert_eq!(state["eventCount"], 0);
    assert_eq!(state["activeUsers"], 0);

    let Ok(phones) = client.get(format!("http://{addr}/api/phones")).send().await else {
        panic!("phones failed");
    };
    let phones: Value = phones.json().await.unwrap_or(Value::Null);
    assert_eq!(phones["phones"], json!([]));
}

#[tokio::test]
async fn invalid_event_is_rejected_without_side_effects() {
    let (addr, state) = spawn_server().await;
    let client = reqwest::Client::new();

    let Ok(response) = client
        .post(format!("http://{addr}/api/events"))
        .json(&json!({"language": "en", "hour": 25, "deviceType": "mobile"}))
        .send()
        .await
    else {
        panic!("event post failed");
    };
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap_or(Value::Null);
    assert_eq!(body["error"]["code"], 1001);
    assert_eq!(state.service.installation_state().event_count, 0);
}
