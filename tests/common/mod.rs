#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use slacker::commands::{CommandHandler, Invocation};
use slacker::error::CommandError;
use slacker::{app, AppConfig, AppState};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tracks environment variable mutations and restores originals on drop.
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    fn capture(&mut self, key: &str) {
        if self.originals.contains_key(key) {
            return;
        }
        let original = std::env::var(key).ok();
        self.originals.insert(key.to_string(), original);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

pub fn config(tokens: &[&str], async_response: bool) -> AppConfig {
    AppConfig {
        tokens: tokens.iter().map(|t| t.to_string()).collect(),
        async_response,
        ..AppConfig::default()
    }
}

/// Serve `state` on an ephemeral port with socket addresses available.
pub async fn spawn_app(state: AppState) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app(state);
    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (format!("http://{}", addr), handle)
}

async fn serve(router: Router) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

/// Mock response_url endpoint. Every JSON body posted to the returned URL
/// is forwarded on the channel; the endpoint answers with `status`.
pub async fn spawn_callback_sink(
    status: StatusCode,
) -> (String, mpsc::UnboundedReceiver<serde_json::Value>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let router = Router::new().route(
        "/hook",
        post(move |Json(body): Json<serde_json::Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body);
                (status, "callback reply")
            }
        }),
    );
    let (base, handle) = serve(router).await;
    (format!("{}/hook", base), rx, handle)
}

/// Mock quote provider answering every lookup with `body`.
pub async fn spawn_quote_provider(body: serde_json::Value) -> (String, JoinHandle<()>) {
    let router = Router::new().route(
        "/v7/finance/quote",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    serve(router).await
}

pub fn quote_body(symbol: &str, change_percent: f64) -> serde_json::Value {
    serde_json::json!({
        "quoteResponse": {"result": [{
            "symbol": symbol,
            "longName": format!("{} Holdings", symbol),
            "regularMarketPrice": 42.0,
            "regularMarketChangePercent": change_percent,
            "regularMarketPreviousClose": 41.0,
            "regularMarketTime": 1_700_000_000
        }]}
    })
}

pub fn empty_quote_body() -> serde_json::Value {
    serde_json::json!({"quoteResponse": {"result": []}})
}

/// Succeeds with an empty body.
pub struct Echo;

#[async_trait::async_trait]
impl CommandHandler for Echo {
    async fn handle(&self, _invocation: &Invocation<'_>) -> Result<Response, CommandError> {
        Ok(StatusCode::OK.into_response())
    }
}

/// Replies with the request id it was invoked under.
pub struct WhoAmI;

#[async_trait::async_trait]
impl CommandHandler for WhoAmI {
    async fn handle(&self, invocation: &Invocation<'_>) -> Result<Response, CommandError> {
        Ok(invocation.context.request_id.to_string().into_response())
    }
}

/// Fails with whatever error it was built with.
pub struct Failing(pub fn() -> CommandError);

#[async_trait::async_trait]
impl CommandHandler for Failing {
    async fn handle(&self, _invocation: &Invocation<'_>) -> Result<Response, CommandError> {
        Err((self.0)())
    }
}
