use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::logging::{redact_headers, Level, SharedJournal};
use crate::models::{self, ModelListing};
use crate::proxy;
use crate::relay::request::{Credential, EVENT_STREAM};
use crate::relay::types::ChatRequest;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub client: reqwest::Client,
    pub journal: SharedJournal,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/v1/models", get(handle_models))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(err: &RelayError) -> Response {
    (err.status(), Json(err.envelope())).into_response()
}

/// Check the credential header. The body is only looked at afterwards, so a missing
/// key is reported as 401 whatever the body contains.
fn credential(state: &AppState, headers: &HeaderMap, route: &str) -> Result<Credential, Response> {
    let header = state.config.credential_header();
    state.journal.with_context(
        Level::Debug,
        "server",
        format!("{} headers", route),
        redact_headers(headers, &header),
    );

    Credential::from_headers(headers, &header).map_err(|e| {
        state.journal.warn("server", format!("{}: {}", route, e));
        error_response(&e)
    })
}

async fn handle_chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let credential = match credential(&state, &headers, "chat") {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            let err = RelayError::invalid_request(e.to_string());
            state.journal.error("server", err.to_string());
            return error_response(&err);
        }
    };

    let response = match proxy::forward_chat(
        &req,
        &credential,
        &state.config,
        &state.client,
        &state.journal,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            state.journal.error("server", format!("Request failed: {}", e));
            return error_response(&e);
        }
    };

    if req.is_streaming() {
        let events = proxy::relay_streaming(response, &state.journal);
        return Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(events))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    match proxy::relay_blocking(response, &state.journal).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn handle_models(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let credential = match credential(&state, &headers, "models") {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match models::list_models(&credential, &state.config, &state.client, &state.journal).await {
        ModelListing::Live(value) => Json(value).into_response(),
        ModelListing::Fallback(catalog) => Json(catalog).into_response(),
    }
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
