//! Integration test: start the gateway on a free port against a fake bus (an axum server that
//! records publishes), POST signed LINE webhooks, and check status codes and published topics.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tombot::channels::LineWebhook;
use tombot::config::Config;
use tombot::gateway;
use tombot::publish::HttpPublisher;
use tokio::sync::oneshot;

const SECRET: &str = "integration-secret";

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

#[derive(Clone, Default)]
struct FakeBus {
    published: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    /// Reject the n-th publish (1-based) with 503.
    fail_on: Option<usize>,
}

async fn bus_publish(
    State(bus): State<FakeBus>,
    Path(topic): Path<String>,
    body: Bytes,
) -> StatusCode {
    let value: serde_json::Value = serde_json::from_slice(&body).expect("bus got JSON");
    let mut published = bus.published.lock().unwrap();
    published.push((topic, value));
    if bus.fail_on == Some(published.len()) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn start_bus(bus: FakeBus) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind bus");
    let addr = listener.local_addr().expect("bus addr");
    let app = Router::new()
        .route("/topics/:topic", post(bus_publish))
        .with_state(bus);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

struct Harness {
    url: String,
    bus: FakeBus,
    client: reqwest::Client,
    _shutdown: oneshot::Sender<()>,
}

async fn start(fail_on: Option<usize>) -> Harness {
    let bus = FakeBus {
        fail_on,
        ..Default::default()
    };
    let bus_url = start_bus(bus.clone()).await;

    let port = free_port();
    let mut config = Config::default();
    config.gateway.port = port;
    config.line.channel_secret = Some(SECRET.to_string());
    config.routing.ping_topic = Some("ping-topic".to_string());
    config.routing.unknown_topic = Some("unknown-topic".to_string());

    let publisher = Arc::new(HttpPublisher::new(&bus_url, Duration::from_secs(5)).expect("publisher"));
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        let _ = gateway::run_gateway_with_publisher(config, publisher, shutdown).await;
    });

    let url = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/", url)).send().await {
            if resp.status().is_success() {
                let json: serde_json::Value = resp.json().await.expect("parse JSON");
                assert_eq!(json.get("runtime").and_then(|v| v.as_str()), Some("running"));
                assert_eq!(json.get("port").and_then(|v| v.as_u64()), Some(port as u64));
                return Harness {
                    url,
                    bus,
                    client,
                    _shutdown: tx,
                };
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway at {} did not become healthy within 5s", url);
}

fn text_event(id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "replyToken": format!("reply-{}", id),
        "source": { "type": "user", "userId": "U0123456789" },
        "timestamp": 1700000000000i64,
        "mode": "active",
        "message": { "type": "text", "id": id, "text": text }
    })
}

fn webhook_body(events: Vec<serde_json::Value>) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "destination": "Ubot", "events": events }))
        .expect("encode body")
}

impl Harness {
    async fn post_signed(&self, body: Vec<u8>) -> reqwest::Response {
        let sig = LineWebhook::new(SECRET).sign(&body);
        self.client
            .post(format!("{}/line/webhook", self.url))
            .header("x-line-signature", sig)
            .body(body)
            .send()
            .await
            .expect("post webhook")
    }

    fn topics(&self) -> Vec<String> {
        self.bus
            .published
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }
}

#[tokio::test]
async fn ping_command_is_published_to_ping_topic() {
    let h = start(None).await;
    let resp = h.post_signed(webhook_body(vec![text_event("1", "tmb ping")])).await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(resp.text().await.unwrap(), "");

    let published = h.bus.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "ping-topic");
    assert_eq!(published[0].1["replyToken"], "reply-1");
    assert_eq!(published[0].1["message"]["text"], "tmb ping");
    assert_eq!(published[0].1["source"]["userId"], "U0123456789");
}

#[tokio::test]
async fn unknown_and_empty_commands_go_to_fallback() {
    let h = start(None).await;
    let resp = h
        .post_signed(webhook_body(vec![
            text_event("1", "tmb frobnicate"),
            text_event("2", "tmb "),
        ]))
        .await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(h.topics(), vec!["unknown-topic", "unknown-topic"]);
}

#[tokio::test]
async fn plain_text_and_other_events_are_skipped() {
    let h = start(None).await;
    let follow = serde_json::json!({
        "type": "follow",
        "replyToken": "r",
        "timestamp": 1,
        "source": { "type": "user", "userId": "U1" }
    });
    let resp = h
        .post_signed(webhook_body(vec![text_event("1", "hello world"), follow]))
        .await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(h.topics().is_empty());
}

#[tokio::test]
async fn callback_alias_route_dispatches() {
    let h = start(None).await;
    let body = webhook_body(vec![text_event("1", "tmb ping")]);
    let sig = LineWebhook::new(SECRET).sign(&body);
    let resp = h
        .client
        .post(format!("{}/callback", h.url))
        .header("X-Line-Signature", sig)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(h.topics(), vec!["ping-topic"]);
}

#[tokio::test]
async fn publish_failure_stops_remaining_events() {
    let h = start(Some(2)).await;
    let resp = h
        .post_signed(webhook_body(vec![
            text_event("1", "tmb ping"),
            text_event("2", "tmb frobnicate"),
            text_event("3", "tmb ping"),
        ]))
        .await;
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = resp.json().await.unwrap();
    let message = json["message"].as_str().unwrap();
    assert!(message.contains("unknown-topic"), "message: {}", message);
    assert!(message.contains("503"), "message: {}", message);

    let published = h.bus.published.lock().unwrap().clone();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].1["message"]["id"], "1");
    assert_eq!(published[1].1["message"]["id"], "2");
}

#[tokio::test]
async fn bad_signature_is_rejected_before_dispatch() {
    let h = start(None).await;
    let body = webhook_body(vec![text_event("1", "tmb ping")]);
    let sig = LineWebhook::new("wrong-secret").sign(&body);
    let resp = h
        .client
        .post(format!("{}/line/webhook", h.url))
        .header("X-Line-Signature", sig)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "invalid signature");
    assert!(h.topics().is_empty());
}

#[tokio::test]
async fn missing_signature_and_malformed_body_are_rejected() {
    let h = start(None).await;
    let resp = h
        .client
        .post(format!("{}/line/webhook", h.url))
        .body(webhook_body(vec![text_event("1", "tmb ping")]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "missing X-Line-Signature header");

    let resp = h.post_signed(b"{\"events\": [".to_vec()).await;
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.topics().is_empty());
}
