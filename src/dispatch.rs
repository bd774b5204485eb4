//! Authentication and routing of slash command invocations.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::Method;
use axum::response::{IntoResponse, Response};

use crate::commands::{CommandRegistry, Invocation};
use crate::context::RequestContext;
use crate::delivery::Responder;
use crate::error::CommandError;

/// Form fields Slack posts with every slash command. Unknown fields are
/// ignored; missing ones are `None`.
#[derive(Debug, Clone, Default)]
pub struct CommandForm {
    pub token: Option<String>,
    pub command: Option<String>,
    pub text: Option<String>,
    pub user_name: Option<String>,
    pub team_domain: Option<String>,
    pub channel_name: Option<String>,
    pub response_url: Option<String>,
}

impl CommandForm {
    /// Collect decoded form pairs. When a key repeats, its first value wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "token" => &mut form.token,
                "command" => &mut form.command,
                "text" => &mut form.text,
                "user_name" => &mut form.user_name,
                "team_domain" => &mut form.team_domain,
                "channel_name" => &mut form.channel_name,
                "response_url" => &mut form.response_url,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        form
    }
}

/// Argument text that short-circuits routing and returns [`version_banner`].
pub const VERSION_FLAG: &str = "-version";

pub fn version_banner() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[derive(Clone)]
pub struct Dispatcher {
    /// Accepted tokens. Empty means every request is accepted.
    tokens: Arc<HashSet<String>>,
    registry: Arc<CommandRegistry>,
    responder: Responder,
}

impl Dispatcher {
    pub fn new(tokens: HashSet<String>, registry: CommandRegistry, responder: Responder) -> Self {
        Self {
            tokens: Arc::new(tokens),
            registry: Arc::new(registry),
            responder,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    fn authenticate(&self, form: &CommandForm) -> Result<(), CommandError> {
        if self.tokens.is_empty() {
            return Ok(());
        }
        let token = form.token.as_deref().unwrap_or("");
        if self.tokens.contains(token) {
            Ok(())
        } else {
            Err(CommandError::bad_request(format!(
                "Token '{}' is invalid",
                token
            )))
        }
    }

    /// Validate and route one invocation. On success the returned response
    /// is the complete HTTP reply.
    pub async fn dispatch(
        &self,
        method: &Method,
        form: &CommandForm,
        ctx: &RequestContext,
    ) -> Result<Response, CommandError> {
        if method != Method::POST {
            return Err(CommandError::bad_request("Only POST is supported"));
        }
        self.authenticate(form)?;

        if form.text.as_deref() == Some(VERSION_FLAG) {
            return Ok(version_banner().into_response());
        }

        let command = form.command.as_deref().unwrap_or("").to_lowercase();
        let handler = self.registry.lookup(&command).ok_or_else(|| {
            CommandError::bad_request(format!("Command '{}' is invalid", command))
        })?;

        tracing::info!(
            target: "audit",
            request_id = ctx.request_id,
            client = %ctx.client_address,
            user = form.user_name.as_deref().unwrap_or(""),
            team = form.team_domain.as_deref().unwrap_or(""),
            channel = form.channel_name.as_deref().unwrap_or(""),
            command = %command,
            text = form.text.as_deref().unwrap_or(""),
            "dispatching command"
        );

        let invocation = Invocation {
            context: ctx,
            form,
            responder: &self.responder,
        };
        handler.handle(&invocation).await
    }
}
