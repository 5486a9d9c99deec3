//! One-shot loopback listener capturing the OAuth authorization code.

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};

/// Upper bound on waiting for in-flight responses after the code arrived
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type CodeSender = Arc<Mutex<Option<oneshot::Sender<std::result::Result<String, String>>>>>;

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Build the browser URL that starts the authorization-code flow
pub fn authorize_url(api_base: &str, client_id: &str, redirect_uri: &str) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        &format!("{}/oauth/authorize", api_base),
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", "public"),
        ],
    )
    .context("Failed to build authorize URL")?;
    Ok(url.to_string())
}

/// Local HTTP listener serving `/callback` until one code arrives.
/// The server is shut down when the code is received, on timeout, or on drop.
pub struct CallbackServer {
    port: u16,
    code_rx: Option<oneshot::Receiver<std::result::Result<String, String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:port` (0 picks a free port) and start serving
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind OAuth callback listener on port {}", port))?;
        let port = listener
            .local_addr()
            .context("Failed to read callback listener address")?
            .port();

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let sender: CodeSender = Arc::new(Mutex::new(Some(code_tx)));

        let app = Router::new()
            .route("/callback", get(handle_callback))
            .with_state(sender);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                tracing::warn!("OAuth callback listener stopped with error: {}", e);
            }
        });

        tracing::debug!("OAuth callback listener on 127.0.0.1:{}", port);

        Ok(Self {
            port,
            code_rx: Some(code_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the redirect carrying the code, then shut the listener down
    pub async fn wait_for_code(mut self, timeout: Duration) -> Result<String> {
        let code_rx = self
            .code_rx
            .take()
            .ok_or_else(|| SyncError::Internal(anyhow::anyhow!("Callback already consumed")))?;

        let outcome = tokio::time::timeout(timeout, code_rx).await;
        self.shutdown().await;

        match outcome {
            Ok(Ok(Ok(code))) => {
                tracing::info!("Authorization code received");
                Ok(code)
            }
            Ok(Ok(Err(reason))) => Err(SyncError::Auth(format!("Authorization denied: {}", reason))),
            Ok(Err(_)) => Err(SyncError::Internal(anyhow::anyhow!(
                "OAuth callback listener exited before a code arrived"
            ))),
            Err(_) => Err(SyncError::Auth(format!(
                "No OAuth callback received within {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        tracing::debug!("OAuth callback listener on port {} stopped", self.port);
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn handle_callback(
    State(sender): State<CodeSender>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let outcome = match (params.code, params.error) {
        (Some(code), _) if !code.is_empty() => Ok(code),
        (_, Some(error)) => Err(match params.error_description {
            Some(desc) => format!("{} ({})", error, desc),
            None => error,
        }),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Html("Missing authorization code.".to_string()),
            )
        }
    };

    let accepted = outcome.is_ok();
    let tx = sender.lock().ok().and_then(|mut guard| guard.take());
    match tx {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => {
            return (
                StatusCode::GONE,
                Html("Authorization already completed.".to_string()),
            )
        }
    }

    if accepted {
        (
            StatusCode::OK,
            Html("✅ Code received! You can close this window.".to_string()),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Html("Authorization was denied. You can close this window.".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_is_encoded() {
        let url = authorize_url(
            "https://api.intra.42.fr",
            "u-s4t2ud-abc",
            "http://localhost:8080/callback",
        )
        .unwrap();

        assert!(url.starts_with("https://api.intra.42.fr/oauth/authorize?"));
        assert!(url.contains("client_id=u-s4t2ud-abc"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn test_receives_code() {
        let server = CallbackServer::bind(0).await.unwrap();
        let url = format!("http://127.0.0.1:{}/callback?code=abc123", server.port());

        let browser = tokio::spawn(async move {
            let response = reqwest::get(url).await.unwrap();
            response.status()
        });

        let code = server.wait_for_code(Duration::from_secs(5)).await.unwrap();
        assert_eq!(code, "abc123");
        assert_eq!(browser.await.unwrap(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_code_keeps_waiting() {
        let server = CallbackServer::bind(0).await.unwrap();
        let base = format!("http://127.0.0.1:{}/callback", server.port());

        let browser = tokio::spawn(async move {
            let first = reqwest::get(format!("{}?state=x", base)).await.unwrap();
            let second = reqwest::get(format!("{}?code=late", base)).await.unwrap();
            (first.status(), second.status())
        });

        let code = server.wait_for_code(Duration::from_secs(5)).await.unwrap();
        assert_eq!(code, "late");
        let (first, second) = browser.await.unwrap();
        assert_eq!(first, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(second, reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_denied_authorization() {
        let server = CallbackServer::bind(0).await.unwrap();
        let url = format!(
            "http://127.0.0.1:{}/callback?error=access_denied&error_description=nope",
            server.port()
        );
        tokio::spawn(async move {
            let _ = reqwest::get(url).await;
        });

        let err = server.wait_for_code(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(ref msg) if msg.contains("access_denied")));
    }

    #[tokio::test]
    async fn test_times_out_and_releases_port() {
        let server = CallbackServer::bind(0).await.unwrap();
        let port = server.port();

        let err = server
            .wait_for_code(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(ref msg) if msg.contains("No OAuth callback")));

        // Listener is gone, so the port can be bound again
        let rebound = CallbackServer::bind(port).await;
        assert!(rebound.is_ok());
    }
}
