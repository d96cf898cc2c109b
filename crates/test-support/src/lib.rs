//! In-process HTTP server for loader tests.
//!
//! [`DocumentServer`] serves canned documents from a background thread (with its own tokio
//! runtime), so blocking clients can be exercised from plain `#[test]` functions. Every request is
//! recorded per path together with its headers.

use anyhow::Context as _;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use url::Url;

/// A document served at a fixed path.
#[derive(Debug, Clone)]
pub struct ServedDocument {
    pub path: String,
    /// `None` sends no `Content-Type` header.
    pub content_type: Option<String>,
    pub body: String,
    pub status: u16,
}

impl ServedDocument {
    pub fn new(path: &str, content_type: Option<&str>, body: &str) -> Self {
        Self {
            path: path.to_string(),
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
            status: 200,
        }
    }

    #[must_use]
    pub fn json(path: &str, body: &str) -> Self {
        Self::new(path, Some("application/json"), body)
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

struct ServerState {
    documents: HashMap<String, ServedDocument>,
    requests: Mutex<HashMap<String, Vec<HeaderMap>>>,
}

async fn serve_document(
    State(state): State<Arc<ServerState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().to_string();
    state
        .requests
        .lock()
        .entry(path.clone())
        .or_default()
        .push(headers);

    let Some(doc) = state.documents.get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let status = StatusCode::from_u16(doc.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = (status, doc.body.clone()).into_response();
    match &doc.content_type {
        Some(ct) => {
            if let Ok(value) = ct.parse() {
                resp.headers_mut().insert(header::CONTENT_TYPE, value);
            }
        }
        None => {
            resp.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    resp
}

/// Running server; shut down and joined on drop.
pub struct DocumentServer {
    base: Url,
    state: Arc<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DocumentServer {
    /// Bind an ephemeral localhost port and start serving `documents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound or the runtime cannot be created.
    pub fn start(documents: Vec<ServedDocument>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
        listener
            .set_nonblocking(true)
            .context("set listener non-blocking")?;
        let addr = listener.local_addr().context("read local address")?;
        let base = Url::parse(&format!("http://{addr}/")).context("build base URL")?;

        let state = Arc::new(ServerState {
            documents: documents
                .into_iter()
                .map(|d| (d.path.clone(), d))
                .collect(),
            requests: Mutex::new(HashMap::new()),
        });
        let app = Router::new()
            .fallback(serve_document)
            .with_state(Arc::clone(&state));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build server runtime")?;
        let (tx, rx) = oneshot::channel::<()>();

        let thread = std::thread::spawn(move || {
            runtime.block_on(async move {
                let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                    return;
                };
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = rx.await;
                    })
                    .await;
            });
        });

        Ok(Self {
            base,
            state,
            shutdown: Some(tx),
            thread: Some(thread),
        })
    }

    /// Absolute URL of `path` on this server.
    ///
    /// # Panics
    ///
    /// Panics if `path` cannot be joined onto the server's base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("join served path")
    }

    /// Number of requests received for `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.state.requests.lock().get(path).map_or(0, Vec::len)
    }

    /// Value of `header` on the most recent request for `path`.
    #[must_use]
    pub fn last_header(&self, path: &str, header: &str) -> Option<String> {
        self.state
            .requests
            .lock()
            .get(path)
            .and_then(|reqs| reqs.last())
            .and_then(|h| h.get(header))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

impl Drop for DocumentServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
