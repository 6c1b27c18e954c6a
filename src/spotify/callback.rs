//! One-shot local listener for the OAuth redirect.
//!
//! The listener serves the redirect URI's path, hands the first `code` it
//! sees to the waiting task over a oneshot channel, then shuts itself down.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AppError, Result};

const SUCCESS_BODY: &str = "Authorization successful. Please close this tab.";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct CallbackState {
    code_tx: Mutex<Option<oneshot::Sender<String>>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

pub struct CallbackServer {
    addr: SocketAddr,
    code_rx: oneshot::Receiver<String>,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Binds to the host and port of `redirect_uri` and starts serving its path.
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = Url::parse(redirect_uri)?;
        let host = match url.host_str() {
            Some("localhost") | None => "127.0.0.1".to_string(),
            Some(host) => host.trim_matches(|c| c == '[' || c == ']').to_string(),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AppError::Config(format!("No port in redirect URI {}", redirect_uri)))?;
        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(CallbackState {
            code_tx: Mutex::new(Some(code_tx)),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
        });

        let app = Router::new()
            .route(&path, get(receive_code))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
        let addr = listener.local_addr()?;
        info!("Listening for the authorization redirect on http://{}{}", addr, path);

        let handle = tokio::spawn(async move {
            let shutdown = async {
                shutdown_rx.await.ok();
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!("Callback listener stopped with error: {}", e);
            }
        });

        Ok(Self {
            addr,
            code_rx,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the redirect to deliver a code, failing after `timeout` or on Ctrl-C.
    pub async fn wait_for_code(self, timeout: Duration) -> Result<String> {
        let Self { code_rx, mut handle, .. } = self;

        let outcome = tokio::select! {
            received = tokio::time::timeout(timeout, code_rx) => match received {
                Ok(Ok(code)) => Ok(code),
                Ok(Err(_)) => Err(AppError::Auth(
                    "Callback listener stopped before a code arrived".into(),
                )),
                Err(_) => Err(AppError::AuthTimeout(timeout.as_secs())),
            },
            _ = tokio::signal::ctrl_c() => Err(AppError::AuthCancelled),
        };

        match outcome {
            Ok(code) => {
                // Let the listener finish answering the browser, but not forever.
                if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                    debug!("Callback listener still busy after capture, aborting it");
                    handle.abort();
                }
                Ok(code)
            }
            Err(e) => {
                handle.abort();
                Err(e)
            }
        }
    }
}

async fn receive_code(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    let Some(code) = params.get("code").filter(|c| !c.is_empty()) else {
        if let Some(error) = params.get("error") {
            warn!("Authorization redirect carried an error: {}", error);
        }
        return (StatusCode::NOT_FOUND, "Not found");
    };

    let Some(code_tx) = state.code_tx.lock().ok().and_then(|mut tx| tx.take()) else {
        debug!("Ignoring repeated authorization redirect");
        return (StatusCode::NOT_FOUND, "Not found");
    };

    if code_tx.send(code.clone()).is_err() {
        warn!("Authorization code arrived after the wait was abandoned");
    }
    if let Some(shutdown_tx) = state.shutdown_tx.lock().ok().and_then(|mut tx| tx.take()) {
        shutdown_tx.send(()).ok();
    }

    (StatusCode::OK, SUCCESS_BODY)
}
