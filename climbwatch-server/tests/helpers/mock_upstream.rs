//! Stand-in for the vendor API
//!
//! Serves `/occupancy?branch=<id>` and `/trend?branch=<id>` from a reply table
//! the test can change between cycles. Unknown branches get a 404.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use climbwatch_common::Branch;
use climbwatch_server::config::UpstreamConfig;
use serde_json::{json, Value};

/// Canned response for one branch on one endpoint
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    /// 200 with a body that is not valid JSON
    Malformed,
    /// Respond with `Value` after sleeping
    Delay(Duration, Value),
    Status(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Endpoint {
    Occupancy,
    Trend,
}

type Replies = Arc<Mutex<HashMap<(Endpoint, String), Reply>>>;

#[derive(Clone)]
pub struct MockUpstream {
    replies: Replies,
    pub addr: SocketAddr,
}

impl MockUpstream {
    /// Bind to an ephemeral port and serve in the background
    pub async fn start() -> Self {
        let replies: Replies = Arc::new(Mutex::new(HashMap::new()));

        let app = Router::new()
            .route("/occupancy", get(occupancy))
            .route("/trend", get(trend))
            .with_state(replies.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let addr = listener.local_addr().expect("Mock upstream has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock upstream failed");
        });

        Self { replies, addr }
    }

    pub fn set_occupancy(&self, branch: Branch, reply: Reply) {
        self.set(Endpoint::Occupancy, branch, reply);
    }

    pub fn set_trend(&self, branch: Branch, reply: Reply) {
        self.set(Endpoint::Trend, branch, reply);
    }

    /// Serve a healthy occupancy reading and a 16-slot trend for every branch
    pub fn serve_all_healthy(&self) {
        for (i, branch) in Branch::all().into_iter().enumerate() {
            let pct = 10.0 * (i as f64 + 1.0);
            self.set_occupancy(branch, Reply::Json(occupancy_json(branch.name(), "Quiet", pct)));
            self.set_trend(branch, Reply::Json(trend_json(pct)));
        }
    }

    pub fn upstream_config(&self, timeout: Duration) -> UpstreamConfig {
        UpstreamConfig {
            occupancy_url: format!("http://{}/occupancy?branch=", self.addr),
            attendance_url: format!("http://{}/trend?branch=", self.addr),
            timeout,
        }
    }

    fn set(&self, endpoint: Endpoint, branch: Branch, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert((endpoint, branch.upstream_id().to_string()), reply);
    }
}

async fn respond(replies: Replies, endpoint: Endpoint, params: HashMap<String, String>) -> Response {
    let reply = params
        .get("branch")
        .and_then(|id| replies.lock().unwrap().get(&(endpoint, id.clone())).cloned());

    match reply {
        Some(Reply::Json(value)) => Json(value).into_response(),
        Some(Reply::Malformed) => (
            [(header::CONTENT_TYPE, "application/json")],
            "{\"LastUpdated\": \"2024-03-05T08:30:00Z\", \"CurrentPerc",
        )
            .into_response(),
        Some(Reply::Delay(delay, value)) => {
            tokio::time::sleep(delay).await;
            Json(value).into_response()
        }
        Some(Reply::Status(code)) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn occupancy(
    State(replies): State<Replies>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    respond(replies, Endpoint::Occupancy, params).await
}

async fn trend(
    State(replies): State<Replies>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    respond(replies, Endpoint::Trend, params).await
}

/// Occupancy object in the vendor's shape
pub fn occupancy_json(name: &str, status: &str, current_percentage: f64) -> Value {
    json!({
        "LastUpdated": "2024-03-05T08:30:00Z",
        "Name": name,
        "Status": status,
        "CurrentPercentage": current_percentage,
    })
}

/// 16 trend slots (hours 6-21) in the vendor's shape, misspelled key included
pub fn trend_json(base: f64) -> Value {
    let slots: Vec<Value> = (6..22)
        .map(|hour| {
            json!({
                "hour": hour,
                "percantage": base + hour as f64,
                "remaining": 100.0 - base,
            })
        })
        .collect();
    Value::Array(slots)
}
