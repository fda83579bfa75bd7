//! Development server for compiled blueprint pages.
//!
//! Serves the output directory, lists the compiled pages at `/` and asks open
//! browsers to reload when the HTML, CSS or JS of the page they show is
//! rewritten. The browser error collector runs next to it.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use blueprint_core::compiler::is_valid_page_name;
use blueprint_core::config::Config;
use blueprint_core::ArtifactKind;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

pub mod collector;

pub use collector::{CollectorConfig, ErrorCollector};

pub const LIVERELOAD_PATH: &str = "/__livereload";
const RELOAD_PREFIX: &str = "reload:";

#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub host: String,
    pub port: u16,
    /// Compiled pages
    pub output_dir: PathBuf,
    pub open: bool,
    /// Error collector to run alongside, if pages are instrumented
    pub collector: Option<CollectorConfig>,
}

impl DevServerConfig {
    pub fn from_config(config: &Config) -> Self {
        let server = &config.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            output_dir: config.build.output.clone(),
            open: server.open,
            collector: config.telemetry.enabled.then(|| {
                CollectorConfig::for_output(&server.host, server.collector_port, &config.build.output)
            }),
        }
    }
}

/// Page a changed output file belongs to: `login.css` is part of `login`.
pub fn page_for_artifact(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    if !ArtifactKind::ALL.iter().any(|kind| kind.extension() == extension) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    is_valid_page_name(stem).then(|| stem.to_string())
}

#[derive(Clone)]
struct AppState {
    output_dir: Arc<PathBuf>,
    reload_tx: broadcast::Sender<String>,
    script: Arc<String>,
}

pub struct DevServer {
    config: DevServerConfig,
    reload_tx: broadcast::Sender<String>,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        let (reload_tx, _) = broadcast::channel(100);
        Self { config, reload_tx }
    }

    /// Script the compiled pages need to follow reloads.
    pub fn reload_script(&self) -> String {
        livereload_script(&self.config.host, self.config.port)
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            output_dir: Arc::new(self.config.output_dir.clone()),
            reload_tx: self.reload_tx.clone(),
            script: Arc::new(self.reload_script()),
        };

        Router::new()
            .route("/", get(page_index))
            .route(LIVERELOAD_PATH, get(websocket_handler))
            .fallback_service(ServeDir::new(&self.config.output_dir))
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        if !self.config.output_dir.is_dir() {
            bail!(
                "Output directory does not exist: {}",
                self.config.output_dir.display()
            );
        }

        let _watcher = watch_output(&self.config.output_dir, self.reload_tx.clone())?;

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(output = %self.config.output_dir.display(), "Serving pages at http://{addr}");

        if self.config.open {
            if let Err(e) = open::that(format!("http://{addr}")) {
                warn!("Failed to open browser: {e}");
            }
        }

        let pages = axum::serve(listener, self.router());
        match self.config.collector {
            Some(collector) => {
                tokio::try_join!(
                    async { pages.await.map_err(anyhow::Error::from) },
                    ErrorCollector::new(collector).run(),
                )?;
            }
            None => pages.await?,
        }

        Ok(())
    }
}

/// `index.html` when the output has one, otherwise a list of the compiled
/// pages.
async fn page_index(State(state): State<AppState>) -> impl IntoResponse {
    let index = state.output_dir.join("index.html");
    if let Ok(html) = tokio::fs::read_to_string(&index).await {
        return Html(html);
    }

    match compiled_pages(&state.output_dir).await {
        Ok(pages) => Html(render_page_list(&pages, &state.script)),
        Err(e) => {
            error!(output = %state.output_dir.display(), "Could not list pages: {e}");
            Html(render_page_list(&[], &state.script))
        }
    }
}

async fn compiled_pages(output_dir: &Path) -> std::io::Result<Vec<String>> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == ArtifactKind::Html.extension()) {
            if let Some(page) = page_for_artifact(&path) {
                pages.push(page);
            }
        }
    }
    pages.sort();
    Ok(pages)
}

fn render_page_list(pages: &[String], script: &str) -> String {
    let items = if pages.is_empty() {
        "<p>No pages yet. Add a blueprint to the source directory.</p>".to_string()
    } else {
        let links: String = pages
            .iter()
            .map(|page| {
                format!(
                    "<li><a href=\"{}.html\">{}</a></li>",
                    html_escape::encode_double_quoted_attribute(page),
                    html_escape::encode_text(page)
                )
            })
            .collect();
        format!("<ul>{links}</ul>")
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Blueprint pages</title></head>\n<body>\n<h1>Compiled pages</h1>\n{items}\n{script}</body>\n</html>\n"
    )
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| follow_reloads(socket, state.reload_tx))
}

/// Forward every reload message to one browser until either side goes away.
async fn follow_reloads(mut socket: WebSocket, reload_tx: broadcast::Sender<String>) {
    let mut rx = reload_tx.subscribe();

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(reload) => {
                    if socket.send(Message::Text(reload.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Browser fell behind on reloads");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = socket.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }
    }
}

/// Broadcast `reload:<page>` once per page whose files changed in a debounce
/// window. Stops when the returned debouncer is dropped.
fn watch_output(
    output_dir: &Path,
    reload_tx: broadcast::Sender<String>,
) -> Result<Debouncer<notify::RecommendedWatcher>> {
    let mut debouncer = new_debouncer(
        Duration::from_millis(300),
        move |res: DebounceEventResult| match res {
            Ok(events) => {
                let pages: BTreeSet<String> = events
                    .iter()
                    .filter_map(|event| page_for_artifact(&event.path))
                    .collect();
                for page in pages {
                    debug!(page = %page, "Page changed");
                    // nobody listening is fine
                    let _ = reload_tx.send(format!("{RELOAD_PREFIX}{page}"));
                }
            }
            Err(e) => warn!("Output watcher error: {e}"),
        },
    )?;

    debouncer
        .watcher()
        .watch(output_dir, notify::RecursiveMode::NonRecursive)?;
    debug!(path = %output_dir.display(), "Watching output for reloads");

    Ok(debouncer)
}

/// Browser side of the reload channel. A page reloads when its own files
/// change; the page list at `/` reloads on any change.
pub fn livereload_script(host: &str, port: u16) -> String {
    format!(
        r#"
<script>
(function() {{
    const file = location.pathname.split('/').pop();
    const page = file.replace(/\.html$/, '');
    const socket = new WebSocket('ws://{host}:{port}{LIVERELOAD_PATH}');
    socket.onmessage = function(event) {{
        if (event.data === '{RELOAD_PREFIX}' + page || (file === '' && event.data.startsWith('{RELOAD_PREFIX}'))) {{
            location.reload();
        }}
    }};
    socket.onclose = function() {{
        console.log('Live reload disconnected');
    }};
}})();
</script>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn server(dir: &TempDir) -> DevServer {
        let mut config = Config::default();
        config.build.output = dir.path().to_path_buf();
        DevServer::new(DevServerConfig::from_config(&config))
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_page_for_artifact() {
        assert_eq!(page_for_artifact(Path::new("/out/login.html")).as_deref(), Some("login"));
        assert_eq!(page_for_artifact(Path::new("/out/login.css")).as_deref(), Some("login"));
        assert_eq!(page_for_artifact(Path::new("/out/app.js")).as_deref(), Some("app"));
        assert_eq!(page_for_artifact(Path::new("/out/browser-errors.jsonl")), None);
        assert_eq!(page_for_artifact(Path::new("/out/.login.html.swp")), None);
        assert_eq!(page_for_artifact(Path::new("/out/notes.txt")), None);
    }

    #[test]
    fn test_collector_follows_telemetry() {
        let mut config = Config::default();
        let with = DevServerConfig::from_config(&config);
        assert_eq!(with.collector.map(|c| c.port), Some(3002));

        config.telemetry.enabled = false;
        assert!(DevServerConfig::from_config(&config).collector.is_none());
    }

    #[test]
    fn test_reload_script_targets_server() {
        let script = livereload_script("127.0.0.1", 3000);
        assert!(script.contains("ws://127.0.0.1:3000/__livereload"));
        assert!(script.contains("'reload:' + page"));
    }

    #[tokio::test]
    async fn test_index_lists_compiled_pages() {
        let dir = TempDir::new().unwrap();
        for name in ["login.html", "login.css", "app.html", ".draft.html", "browser-errors.jsonl"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }

        let (status, body) = get(server(&dir).router(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<li><a href="app.html">app</a></li><li><a href="login.html">login</a></li>"#));
        assert!(!body.contains("draft"));
        assert!(!body.contains("jsonl"));
        assert!(body.contains(LIVERELOAD_PATH));
    }

    #[tokio::test]
    async fn test_index_prefers_index_page() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();

        let (_, body) = get(server(&dir).router(), "/").await;
        assert_eq!(body, "<p>home</p>");
    }

    #[tokio::test]
    async fn test_serves_page_artifacts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("login.css"), "body{}").unwrap();

        let (status, body) = get(server(&dir).router(), "/login.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body{}");

        let (missing, _) = get(server(&dir).router(), "/nope.html").await;
        assert_eq!(missing, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_changed_page_is_announced() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = broadcast::channel(16);
        let _watcher = watch_output(dir.path(), tx).unwrap();

        std::fs::write(dir.path().join("promo.html"), "<p>v2</p>").unwrap();
        std::fs::write(dir.path().join("promo.css"), "p{}").unwrap();

        let message = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, "reload:promo");
    }
}
