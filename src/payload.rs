//! JSON bodies sent back to Slack, either inline or to a `response_url`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Fields Slack should render as markdown.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ResponsePayload {
    /// Bare `in_channel` body used to acknowledge a deferred command.
    pub fn acknowledgement() -> Self {
        Self {
            response_type: ResponseType::InChannel,
            text: None,
            attachments: Vec::new(),
        }
    }

    pub fn in_channel(attachments: Vec<Attachment>) -> Self {
        Self {
            response_type: ResponseType::InChannel,
            text: None,
            attachments,
        }
    }

    /// Plain text visible only to the invoking user.
    pub fn ephemeral_text(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn acknowledgement_has_only_response_type() {
        let v = serde_json::to_value(ResponsePayload::acknowledgement()).unwrap();
        assert_eq!(v, json!({"response_type": "in_channel"}));
    }

    #[test]
    fn attachment_omits_unset_fields() {
        let payload = ResponsePayload::in_channel(vec![Attachment {
            color: Some("danger".into()),
            text: Some("hidden".into()),
            ..Attachment::default()
        }]);
        let v = serde_json::to_value(payload).unwrap();
        assert_eq!(
            v,
            json!({
                "response_type": "in_channel",
                "attachments": [{"color": "danger", "text": "hidden"}]
            })
        );
    }

    #[test]
    fn ephemeral_text_serializes_text_field() {
        let v = serde_json::to_value(ResponsePayload::ephemeral_text("nope")).unwrap();
        assert_eq!(v["response_type"], "ephemeral");
        assert_eq!(v["text"], "nope");
        assert!(v.get("attachments").is_none());
    }
}
