//! Mock market data API for integration tests.
//!
//! Serves `/api/v3/coins/markets` from a script of canned responses:
//! - Responses are returned in order; the last one repeats
//! - Every request's query string and API key header are recorded

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

/// One scripted reply.
#[derive(Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub retry_after: Option<u64>,
    pub body: String,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            retry_after,
            body: r#"{"status":{"error_code":429}}"#.to_string(),
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub params: HashMap<String, String>,
    pub api_key: Option<String>,
}

#[derive(Clone)]
struct MockState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct MockMarketApi {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockMarketApi {
    /// Start the mock API on an available port.
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            replies: Arc::new(Mutex::new(replies.into())),
            seen: seen.clone(),
        };

        let app = Router::new()
            .route("/api/v3/coins/markets", get(markets))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            seen,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v3", self.addr)
    }

    pub async fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn markets(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let api_key = headers
        .get("x-cg-demo-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().await.push(SeenRequest { params, api_key });

    let reply = {
        let mut replies = state.replies.lock().await;
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
    };

    match reply {
        Some(reply) => {
            let mut response = (reply.status, reply.body).into_response();
            if let Some(secs) = reply.retry_after {
                response
                    .headers_mut()
                    .insert("retry-after", secs.to_string().parse().unwrap());
            }
            response
        }
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// JSON for one market record.
pub fn market_json(id: &str, name: &str, price: f64, last_updated: &str) -> String {
    format!(
        r#"{{"id":"{id}","name":"{name}","current_price":{price},"market_cap":{cap},"total_volume":1000.0,"price_change_percentage_24h":0.5,"last_updated":"{last_updated}"}}"#,
        cap = price * 1000.0
    )
}
