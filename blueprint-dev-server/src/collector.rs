//! Receives error reports posted by the instrumented pages and keeps them in a
//! JSON-lines log next to the output.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use blueprint_core::browser_log::append_and_prune;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

pub const COLLECTOR_PATH: &str = "/log-browser-error";
pub use blueprint_core::browser_log::ERROR_LOG_FILE;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub host: String,
    pub port: u16,
    /// JSON-lines file the reports are appended to
    pub log_file: PathBuf,
}

impl CollectorConfig {
    /// Log into `<output_dir>/browser-errors.jsonl`.
    pub fn for_output<P: AsRef<Path>>(host: &str, port: u16, output_dir: P) -> Self {
        Self {
            host: host.to_string(),
            port,
            log_file: output_dir.as_ref().join(ERROR_LOG_FILE),
        }
    }
}

#[derive(Clone)]
struct CollectorState {
    log_file: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

pub struct ErrorCollector {
    config: CollectorConfig,
}

impl ErrorCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    pub fn router(&self) -> Router {
        let state = CollectorState {
            log_file: Arc::new(self.config.log_file.clone()),
            lock: Arc::new(Mutex::new(())),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        Router::new()
            .route(COLLECTOR_PATH, post(log_browser_error))
            .layer(cors)
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let app = self.router();

        info!(log = %self.config.log_file.display(), "Collecting browser errors at http://{addr}{COLLECTOR_PATH}");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn log_browser_error(State(state): State<CollectorState>, body: String) -> impl IntoResponse {
    let mut record = match serde_json::from_str::<Value>(&body) {
        Ok(record @ Value::Object(_)) => record,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": "expected a JSON object" })),
            );
        }
    };

    let now = Utc::now();
    if let Some(fields) = record.as_object_mut() {
        fields
            .entry("timestamp")
            .or_insert_with(|| Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)));
    }

    warn!(
        kind = record["type"].as_str().unwrap_or("unknown"),
        page = record["page"].as_str().unwrap_or("?"),
        "Browser: {}",
        record["message"].as_str().unwrap_or("")
    );

    // one writer at a time; the file work runs off the async workers
    let _guard = state.lock.lock().await;
    let log_file = Arc::clone(&state.log_file);
    let appended = tokio::task::spawn_blocking(move || append_and_prune(&log_file, &record, now))
        .await
        .map_err(std::io::Error::other)
        .and_then(|result| result);

    match appended {
        Ok(_) => (StatusCode::OK, Json(json!({ "success": true }))),
        Err(e) => {
            error!(log = %state.log_file.display(), "Could not record browser error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}
