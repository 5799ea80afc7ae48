//! Short-lived loopback HTTP server receiving the OAuth redirect.
//!
//! The server is an axum router on an ephemeral port. Every connection is
//! served on its own task, so an idle or speculative browser connection never
//! holds up the redirect. The first request on the redirect path is handed to
//! the waiting flow through a oneshot channel. Requests on any other path get
//! a 404 and do not count as the callback.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::{Error, Result};

const SUCCESS_PAGE: &str = "<html><body><h1>Login successful</h1>\
<p>You can close this window and return to the terminal.</p></body></html>";
const FAILURE_PAGE: &str = "<html><body><h1>Login failed</h1>\
<p>Return to the terminal for details.</p></body></html>";
const NOT_FOUND_PAGE: &str = "<html><body><h1>Not found</h1></body></html>";

/// How long `shutdown` waits for in-flight responses before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

type PendingCallback = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Query parameters of the redirect request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        )
    }

    fn from_pairs(mut pairs: HashMap<String, String>) -> Self {
        Self {
            code: pairs.remove("code"),
            state: pairs.remove("state"),
            error: pairs.remove("error"),
            error_description: pairs.remove("error_description"),
        }
    }
}

pub struct CallbackListener {
    addr: SocketAddr,
    redirect_path: String,
    receiver: Option<oneshot::Receiver<CallbackParams>>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CallbackListener {
    /// Bind an ephemeral port on 127.0.0.1 and start serving.
    pub async fn bind(redirect_path: &str) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(|e| Error::Other(format!("failed to start the login callback listener: {e}")))?;
        let addr = listener.local_addr()?;
        let redirect_path = format!("/{}", redirect_path.trim_start_matches('/'));
        tracing::debug!(port = addr.port(), path = %redirect_path, "callback listener bound");

        let (sender, receiver) = oneshot::channel();
        let app = callback_router(&redirect_path, Arc::new(Mutex::new(Some(sender))));

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = stopped.await;
            });
            if let Err(e) = server.await {
                tracing::warn!("callback listener failed: {e}");
            }
        });

        Ok(Self {
            addr,
            redirect_path,
            receiver: Some(receiver),
            stop: Some(stop),
            task,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The `redirect_uri` to register with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.addr.port(), self.redirect_path)
    }

    /// Wait for the redirect. Callers bound this with a deadline.
    pub async fn wait(&mut self) -> Result<CallbackParams> {
        let receiver = self
            .receiver
            .take()
            .ok_or_else(|| Error::Internal("callback already consumed".to_string()))?;
        receiver
            .await
            .map_err(|_| Error::Internal("callback listener stopped unexpectedly".to_string()))
    }

    /// Stop accepting and release the port.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.task)
            .await
            .is_err()
        {
            tracing::debug!("callback connections still open, aborting");
            self.task.abort();
        }
        tracing::debug!(port = self.addr.port(), "callback listener closed");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn callback_router(redirect_path: &str, pending: PendingCallback) -> Router {
    Router::new()
        .route(redirect_path, get(handle_callback))
        .fallback(|| async { (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)) })
        .with_state(pending)
}

async fn handle_callback(
    State(pending): State<PendingCallback>,
    Query(query): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let params = CallbackParams::from_pairs(query);
    let page = if params.error.is_some() || params.code.is_none() {
        FAILURE_PAGE
    } else {
        SUCCESS_PAGE
    };

    match pending.lock().await.take() {
        Some(sender) => {
            let _ = sender.send(params);
        }
        None => tracing::debug!("ignoring repeated callback request"),
    }
    Html(page)
}
