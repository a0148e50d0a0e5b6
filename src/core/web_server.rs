//! Webhook endpoint receiving Telegram updates.
//!
//! Every request carries one Telegram update, deserialized as teloxide's
//! [`teloxide::types::Update`]. It is classified, dispatched to
//! completion, and only then answered, so the request itself is the unit of
//! work. When a server token is configured Telegram must call the URL with
//! `?token=<token>`; see [`crate::telegram::bot::webhook_url`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use teloxide::types::Update as TgUpdate;

use crate::telegram::{classify, BotDispatcher};

/// Shared state for the webhook server.
#[derive(Clone)]
pub struct WebhookState {
    dispatcher: Arc<BotDispatcher>,
    bot_username: Arc<str>,
    server_token: Option<Arc<SecretString>>,
}

impl WebhookState {
    /// `bot_username` decides which `/command@name` messages are ours
    pub fn new(dispatcher: BotDispatcher, bot_username: impl Into<String>, server_token: Option<SecretString>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            bot_username: Arc::from(bot_username.into()),
            server_token: server_token.map(Arc::new),
        }
    }

    fn authorized(&self, token: Option<&str>) -> bool {
        match &self.server_token {
            None => true,
            Some(expected) => token.is_some_and(|token| token == expected.expose_secret()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookQuery {
    token: Option<String>,
}

/// Routes of the webhook server.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", post(webhook_handler))
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the webhook server and serve until the process stops.
pub async fn start_web_server(addr: SocketAddr, state: WebhookState) -> anyhow::Result<()> {
    let app = router(state);

    log::info!("Starting webhook server on http://{}", addr);
    log::info!("  POST /         - Telegram update");
    log::info!("  POST /webhook  - Telegram update");
    log::info!("  GET  /health   - Health check");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// POST /: one Telegram update per request.
async fn webhook_handler(State(state): State<WebhookState>, Query(query): Query<WebhookQuery>, body: Bytes) -> Response {
    if !state.authorized(query.token.as_deref()) {
        log::warn!("Rejected webhook call with a missing or wrong token");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response();
    }

    let update: TgUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            log::warn!("Malformed update body: {}", e);
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "Malformed update"}))).into_response();
        }
    };

    let update_id = update.id.0;
    match classify(update, &state.bot_username) {
        Some(update) => match state.dispatcher.dispatch(update).await {
            Some(kind) => log::debug!("Update {} handled as {}", update_id, kind),
            None => log::debug!("Update {} has no handler attached", update_id),
        },
        None => log::debug!("Ignoring update {} of an unsupported kind", update_id),
    }

    StatusCode::OK.into_response()
}

/// GET /health: simple health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
