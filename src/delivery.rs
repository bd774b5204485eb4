//! Inline versus deferred delivery of command results.
//!
//! In inline mode the rendered payload is the HTTP reply. In deferred mode
//! the reply is a bare acknowledgement and a detached task renders the
//! payload and POSTs it to the caller's `response_url`. The detached task
//! has no way back to the original request: its only effects are the
//! outbound POST and log lines.

use std::future::Future;

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::CommandError;
use crate::payload::ResponsePayload;

/// Outcome of rendering a command result.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Ready(ResponsePayload),
    /// Nothing presentable could be produced; the message explains why.
    Failed(String),
}

impl Rendered {
    /// Payload to post when there is no HTTP status left to report through.
    pub fn into_payload(self) -> ResponsePayload {
        match self {
            Rendered::Ready(payload) => payload,
            Rendered::Failed(message) => ResponsePayload::ephemeral_text(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Inline,
    Deferred,
}

impl DeliveryMode {
    pub fn from_async_flag(async_response: bool) -> Self {
        if async_response {
            DeliveryMode::Deferred
        } else {
            DeliveryMode::Inline
        }
    }
}

#[derive(Clone, Debug)]
pub struct Responder {
    mode: DeliveryMode,
    callback_client: reqwest::Client,
}

impl Responder {
    pub fn new(mode: DeliveryMode, callback_client: reqwest::Client) -> Self {
        Self {
            mode,
            callback_client,
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Deliver the result of `render` according to the configured mode.
    ///
    /// `render` must own everything it touches: in deferred mode it runs
    /// after the HTTP reply has been sent.
    pub async fn deliver<F>(
        &self,
        request_id: u64,
        response_url: Option<&str>,
        render: F,
    ) -> Result<Response, CommandError>
    where
        F: Future<Output = Rendered> + Send + 'static,
    {
        match self.mode {
            DeliveryMode::Inline => match render.await {
                Rendered::Ready(payload) => json_response(&payload),
                Rendered::Failed(message) => Err(CommandError::internal(message)),
            },
            DeliveryMode::Deferred => {
                let url = response_url
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| CommandError::bad_request("No response URL supplied"))?
                    .to_string();
                let client = self.callback_client.clone();
                tokio::spawn(async move {
                    let payload = render.await.into_payload();
                    post_callback(&client, &url, request_id, &payload).await;
                });
                json_response(&ResponsePayload::acknowledgement())
            }
        }
    }
}

/// Serialize `payload` as an `application/json` response.
pub fn json_response(payload: &ResponsePayload) -> Result<Response, CommandError> {
    let body = serde_json::to_vec(payload).map_err(|err| {
        tracing::warn!(error = %err, "could not marshal payload");
        CommandError::internal("Could not marshal response")
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// POST `payload` to a response URL. Failures are logged and dropped.
pub async fn post_callback(
    client: &reqwest::Client,
    url: &str,
    request_id: u64,
    payload: &ResponsePayload,
) {
    let resp = match client.post(url).json(payload).send().await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(request_id, url = %url, error = %err, "failed to post deferred response");
            return;
        }
    };
    let status = resp.status();
    if status == reqwest::StatusCode::OK {
        tracing::debug!(request_id, url = %url, "deferred response delivered");
        return;
    }
    match resp.text().await {
        Ok(body) => tracing::warn!(
            request_id,
            url = %url,
            status = status.as_u16(),
            body = %body,
            "response url rejected deferred response"
        ),
        Err(err) => tracing::warn!(
            request_id,
            url = %url,
            status = status.as_u16(),
            error = %err,
            "could not read reply from response url"
        ),
    }
}
