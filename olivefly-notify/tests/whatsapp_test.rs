//! WhatsApp notifier against an in-process mock of the Cloud API

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use olivefly_notify::{Notifier, NotifyError, WhatsAppConfig, WhatsAppNotifier};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Captured {
    version: String,
    phone_number_id: String,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    reply: String,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn messages(
    State(upstream): State<Upstream>,
    Path((version, phone_number_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    upstream.captured.lock().unwrap().push(Captured {
        version,
        phone_number_id,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (upstream.status, upstream.reply.clone())
}

/// Serve a mock upstream on an ephemeral port and return its base URL.
async fn spawn_upstream(status: StatusCode, reply: &str) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = Upstream {
        status,
        reply: reply.to_string(),
        captured: Arc::clone(&captured),
    };
    let app = Router::new()
        .route("/:version/:phone_number_id/messages", post(messages))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), captured)
}

fn notifier(base_url: &str) -> WhatsAppNotifier {
    WhatsAppNotifier::new(WhatsAppConfig {
        token: "EAAG-secret".to_string(),
        phone_number_id: "1098".to_string(),
        api_version: "v17.0".to_string(),
        base_url: base_url.to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_posts_text_message() {
    let (base_url, captured) =
        spawn_upstream(StatusCode::OK, r#"{"messages":[{"id":"wamid.1"}]}"#).await;

    notifier(&base_url)
        .send("+39 333-111", "Trap 7: 3 olive flies")
        .await
        .unwrap();

    let calls = captured.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.version, "v17.0");
    assert_eq!(call.phone_number_id, "1098");
    assert_eq!(call.authorization.as_deref(), Some("Bearer EAAG-secret"));
    assert_eq!(
        call.body,
        json!({
            "messaging_product": "whatsapp",
            "to": "39333111",
            "type": "text",
            "text": { "body": "Trap 7: 3 olive flies" },
        })
    );
}

#[tokio::test]
async fn test_upstream_rejection_is_reported() {
    let (base_url, captured) = spawn_upstream(
        StatusCode::BAD_REQUEST,
        r#"{"error":{"message":"Recipient phone number not in allowed list"}}"#,
    )
    .await;

    let result = notifier(&base_url).send("39333111", "hi").await;
    match result {
        Err(NotifyError::Rejected { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("not in allowed list"));
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
    assert_eq!(captured.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejection_body_is_truncated() {
    let long = "x".repeat(2000);
    let (base_url, _) = spawn_upstream(StatusCode::INTERNAL_SERVER_ERROR, &long).await;

    match notifier(&base_url).send("39333111", "hi").await {
        Err(NotifyError::Rejected { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body.len(), 500);
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_upstream_is_http_error() {
    // bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = notifier(&format!("http://{}", addr)).send("39333111", "hi").await;
    assert!(matches!(result, Err(NotifyError::Http(_))));
}
