//! Interactive hand-off to an external identity provider.
//!
//! The provider is opened in a browser at an authorization URL. Once the user
//! approves, the provider redirects back to a one-shot callback server on the
//! loopback interface with either the issued delegation or an error in the
//! query string.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use super::{AuthError, DelegatedIdentity};

/// Path the provider redirects back to.
const CALLBACK_PATH: &str = "/callback";

/// HTTP request timeout in seconds for revocation.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const SUCCESS_PAGE: &str =
    "<html><body><h1>Login complete</h1><p>You can close this window.</p></body></html>";
const FAILURE_PAGE: &str =
    "<html><body><h1>Login failed</h1><p>Return to the terminal and try again.</p></body></html>";

/// Parameters for one authorization round-trip.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub provider_url: String,
    pub session_key: String,
    pub max_time_to_live: Duration,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive flow. Resolves once the provider has answered.
    async fn authorize(&self, request: AuthorizeRequest) -> Result<DelegatedIdentity, AuthError>;

    /// Invalidate a delegation previously issued by this provider.
    async fn revoke(&self, identity: &DelegatedIdentity) -> Result<(), AuthError>;
}

/// Redirect query parameters sent by the identity provider
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    principal: Option<String>,
    delegation: Option<String>,
    expiration: Option<String>,
    error: Option<String>,
    session_key: Option<String>,
}

type CallbackResult = Result<DelegatedIdentity, AuthError>;

/// State shared with the callback handler for one authorization.
struct CallbackState {
    session_key: String,
    max_time_to_live: Duration,
    // Taken by the first callback; later ones are answered but ignored
    result_tx: Mutex<Option<oneshot::Sender<CallbackResult>>>,
}

/// Redirect-based provider flow using a loopback callback server.
pub struct LoopbackProvider {
    client: Client,
    base_url: String,
    prompt: Option<mpsc::UnboundedSender<String>>,
}

impl LoopbackProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            prompt: None,
        })
    }

    /// Send every authorization URL to `tx` so the front end can show it.
    pub fn with_prompt(mut self, tx: mpsc::UnboundedSender<String>) -> Self {
        self.prompt = Some(tx);
        self
    }

    fn announce(&self, url: &str) {
        if let Some(ref tx) = self.prompt {
            if tx.send(url.to_string()).is_err() {
                debug!("Prompt receiver dropped");
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for LoopbackProvider {
    async fn authorize(&self, request: AuthorizeRequest) -> Result<DelegatedIdentity, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);

        let url = build_authorize_url(
            &request.provider_url,
            &redirect_uri,
            &request.session_key,
            request.max_time_to_live,
        )?;

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(CallbackState {
            session_key: request.session_key.clone(),
            max_time_to_live: request.max_time_to_live,
            result_tx: Mutex::new(Some(result_tx)),
        });

        // Connections are served concurrently, so an idle browser preconnect
        // cannot hold up the real redirect.
        tokio::spawn(async move {
            let served = axum::serve(listener, callback_router(state))
                // A dropped sender also means stop
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "Callback server failed");
            }
        });

        info!(url = %url, "Waiting for identity provider callback");
        self.announce(url.as_str());

        let result = result_rx
            .await
            .map_err(|_| AuthError::Callback("callback server stopped".to_string()));
        if shutdown_tx.send(()).is_err() {
            debug!("Callback server already stopped");
        }
        result?
    }

    async fn revoke(&self, identity: &DelegatedIdentity) -> Result<(), AuthError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        let url = base
            .join("/logout")
            .map_err(|e| AuthError::InvalidUrl(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&identity.delegation)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AuthError::Provider(format!(
                "logout returned {}",
                response.status()
            )))
        }
    }
}

fn callback_router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(callback_handler))
        .with_state(state)
}

/// Handler for the provider redirect
async fn callback_handler(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let result = parse_callback(&params, &state.session_key, state.max_time_to_live);
    let (status, page) = match result {
        Ok(_) => (StatusCode::OK, SUCCESS_PAGE),
        Err(ref e) => {
            warn!(error = %e, "Identity provider callback did not yield an identity");
            (StatusCode::BAD_REQUEST, FAILURE_PAGE)
        }
    };

    match state.result_tx.lock().await.take() {
        Some(tx) => {
            if tx.send(result).is_err() {
                debug!("Login no longer waiting for callback");
            }
        }
        None => debug!("Duplicate callback ignored"),
    }

    (status, Html(page))
}

/// Build the URL the user opens to authorize this client.
pub fn build_authorize_url(
    provider_url: &str,
    redirect_uri: &str,
    session_key: &str,
    max_time_to_live: Duration,
) -> Result<Url, AuthError> {
    let mut url = Url::parse(provider_url)
        .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", provider_url, e)))?;
    url.query_pairs_mut()
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("session_key", session_key)
        .append_pair(
            "max_time_to_live",
            &max_time_to_live.num_seconds().to_string(),
        );
    url.set_fragment(Some("authorize"));
    Ok(url)
}

/// Turn the redirect's query into an identity or the provider's error.
fn parse_callback(
    params: &CallbackParams,
    session_key: &str,
    max_time_to_live: Duration,
) -> Result<DelegatedIdentity, AuthError> {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    if let Some(error) = present(&params.error) {
        return Err(AuthError::Rejected(error.to_string()));
    }

    if let Some(returned) = present(&params.session_key) {
        if returned != session_key {
            return Err(AuthError::Callback("session key mismatch".to_string()));
        }
    }

    let principal = present(&params.principal)
        .ok_or_else(|| AuthError::Callback("missing principal".to_string()))?;
    let delegation = present(&params.delegation)
        .ok_or_else(|| AuthError::Callback("missing delegation".to_string()))?;

    let latest = Utc::now() + max_time_to_live;
    let expires_at = match present(&params.expiration) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AuthError::Callback(format!("invalid expiration '{}': {}", raw, e)))?,
        None => latest,
    };
    if expires_at > latest {
        warn!(%expires_at, "Provider granted more than the requested time to live, capping");
    }

    Ok(DelegatedIdentity {
        principal: principal.to_string(),
        delegation: delegation.to_string(),
        session_key: session_key.to_string(),
        expires_at: expires_at.min(latest),
    })
}
