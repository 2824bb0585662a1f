//! Local stand-in for the Bot API used by the adapter tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::Uri,
        routing::{get, post},
    },
    serde_json::{Value, json},
    teloxide::Bot,
    tokio::{sync::oneshot, task::JoinHandle},
};

pub const FILE_CONTENTS: &[u8] = b"telegram file contents";

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub body: Value,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    downloads: Arc<Mutex<Vec<String>>>,
}

pub struct MockTelegramApi {
    pub api_url: String,
    state: MockState,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<()>,
}

fn method_from_path(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn ok(result: Value) -> Json<Value> {
    Json(json!({ "ok": true, "result": result }))
}

fn api_error(description: &str) -> Json<Value> {
    Json(json!({ "ok": false, "error_code": 400, "description": description }))
}

fn message_result(body: &Value) -> Value {
    json!({
        "message_id": 77,
        "date": 1,
        "chat": { "id": body["chat_id"], "type": "private", "first_name": "Alice" },
        "text": body["text"],
    })
}

async fn api_handler(State(state): State<MockState>, uri: Uri, body: Bytes) -> Json<Value> {
    let method = method_from_path(uri.path());
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.requests.lock().unwrap().push(CapturedRequest {
        method: method.clone(),
        body: body.clone(),
    });

    match method.as_str() {
        "SendMessage" => ok(message_result(&body)),
        "EditMessageText" if body["text"] == "unchanged" => api_error(
            "Bad Request: message is not modified: specified new message content and reply \
             markup are exactly the same as a current content and reply markup of the message",
        ),
        "EditMessageText" => ok(message_result(&body)),
        "GetFile" if body["file_id"] == "missing" => {
            api_error("Bad Request: invalid file_id")
        },
        "GetFile" => ok(json!({
            "file_id": body["file_id"],
            "file_unique_id": "unique",
            "file_size": FILE_CONTENTS.len(),
            "file_path": format!("documents/{}.bin", body["file_id"].as_str().unwrap_or("x")),
        })),
        _ => ok(json!(true)),
    }
}

async fn file_handler(State(state): State<MockState>, uri: Uri) -> Bytes {
    state.downloads.lock().unwrap().push(uri.path().to_string());
    Bytes::from_static(FILE_CONTENTS)
}

impl MockTelegramApi {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/file/{*path}", get(file_handler))
            .route("/{*path}", post(api_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        Self {
            api_url: format!("http://{addr}/"),
            state,
            shutdown,
            server,
        }
    }

    pub fn bot(&self) -> Bot {
        let api_url = reqwest::Url::parse(&self.api_url).expect("parse api url");
        Bot::new("test-token").set_api_url(api_url)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Bodies of every call to `method`, in order.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .map(|r| r.body)
            .collect()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state.downloads.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.server.await.expect("mock server task");
    }
}
