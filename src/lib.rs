//! Core library for Slacker.  This module wires together the request id
//! middleware, the logging/error wrapper around the dispatcher and the
//! HTTP routes.

mod config;
pub mod commands;
pub mod context;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod payload;
pub mod quote;

pub use config::{AppConfig, DEFAULT_LISTEN_ADDRESS};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Form, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{middleware, Extension, Json, Router};

use crate::commands::CommandRegistry;
use crate::context::{assign_request_id, client_address, RequestContext, RequestId, RequestIdAllocator};
use crate::delivery::{DeliveryMode, Responder};
use crate::dispatch::{CommandForm, Dispatcher};
use crate::error::CommandError;
use crate::quote::QuoteClient;

/// Shared state handed to every request. Everything in here is read-only
/// after startup except the request id counter.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub request_ids: Arc<RequestIdAllocator>,
    /// Maximum accepted request body size in bytes (None => axum default)
    pub max_request_bytes: Option<usize>,
}

/// Build state with the built-in commands.
pub fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let quotes = QuoteClient::new(config.quote_api_url.as_str(), config.http_client_timeout)
        .context("failed to build quote provider client")?;
    build_state_with_registry(config, CommandRegistry::builtin(quotes))
}

/// Build state around an explicit command registry.
pub fn build_state_with_registry(
    config: &AppConfig,
    registry: CommandRegistry,
) -> anyhow::Result<AppState> {
    let callback_client = reqwest::Client::builder()
        .build()
        .context("failed to build callback client")?;
    let responder = Responder::new(
        DeliveryMode::from_async_flag(config.async_response),
        callback_client,
    );
    Ok(AppState {
        dispatcher: Dispatcher::new(config.tokens.clone(), registry, responder),
        request_ids: Arc::new(RequestIdAllocator::new()),
        max_request_bytes: config.max_request_bytes,
    })
}

/// Build state from environment variables (see [`AppConfig::from_env`]).
pub fn build_state_from_env() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    build_state(&config)
}

/// Build the Axum router and attach handlers.
pub fn app(state: AppState) -> Router {
    let cmd = any(command_handler).layer(middleware::from_fn_with_state(
        state.request_ids.clone(),
        assign_request_id,
    ));
    let router = Router::new()
        .route("/cmd", cmd)
        .route("/healthz", get(healthz_handler));

    let router = if let Some(limit) = state.max_request_bytes {
        router.layer(DefaultBodyLimit::max(limit))
    } else {
        router
    };

    router.with_state(state)
}

/// Logging and error translation around [`Dispatcher::dispatch`]. This is
/// the only place a [`CommandError`] becomes an HTTP status.
#[allow(clippy::too_many_arguments)]
async fn command_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let client = client_address(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    tracing::info!(
        request_id,
        client = %client,
        method = %method,
        path = %path,
        version = ?version,
        "request"
    );

    let form = match form {
        Ok(Form(pairs)) => CommandForm::from_pairs(pairs),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let err = CommandError::Classified {
                status: rejection.status(),
                message: rejection.body_text(),
            };
            return error_response(request_id, err);
        }
        Err(rejection) => {
            // Slack always sends a form; anything else is judged on empty fields.
            tracing::debug!(request_id, error = %rejection, "undecodable form treated as empty");
            CommandForm::default()
        }
    };

    let ctx = RequestContext {
        request_id,
        client_address: client,
    };
    match state.dispatcher.dispatch(&method, &form, &ctx).await {
        Ok(resp) => resp,
        Err(err) => error_response(request_id, err),
    }
}

fn error_response(request_id: u64, err: CommandError) -> Response {
    match err {
        CommandError::Classified { status, message } => {
            tracing::warn!(request_id, status = status.as_u16(), "{}", message);
            (status, message).into_response()
        }
        CommandError::Unclassified { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal Server Error - {}", message),
        )
            .into_response(),
    }
}

/// Simple health endpoint for container readiness / liveness checks.
async fn healthz_handler(State(state): State<AppState>) -> Response {
    let json = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commands": state.dispatcher.registry().len(),
        "asyncResponse": state.dispatcher.responder().mode() == DeliveryMode::Deferred,
    });
    (StatusCode::OK, Json(json)).into_response()
}
