use axum::response::Response;

use super::{CommandHandler, Invocation};
use crate::delivery::Rendered;
use crate::error::CommandError;
use crate::payload::{Attachment, ResponsePayload};

/// `/spoiler <text>`: reposts the text pushed below the fold so readers
/// have to expand the attachment to see it.
#[derive(Default)]
pub struct SpoilerCommand;

pub fn render_spoiler(user_name: &str, text: &str) -> ResponsePayload {
    ResponsePayload::in_channel(vec![Attachment {
        color: Some("danger".into()),
        text: Some(format!("{} posted a spoiler...\n\n\n\n\n{}", user_name, text)),
        ..Attachment::default()
    }])
}

#[async_trait::async_trait]
impl CommandHandler for SpoilerCommand {
    async fn handle(&self, invocation: &Invocation<'_>) -> Result<Response, CommandError> {
        let text = invocation.form.text.as_deref().unwrap_or("");
        if text.is_empty() {
            return Err(CommandError::bad_request("Usage: /spoiler <text to hide>"));
        }
        let payload = render_spoiler(
            invocation.form.user_name.as_deref().unwrap_or(""),
            text,
        );
        invocation
            .deliver(async move { Rendered::Ready(payload) })
            .await
    }
}
