//! Errors returned by the dispatcher and command handlers.
//!
//! Handlers never write failure responses themselves; they return a
//! [`CommandError`] and the request wrapper turns it into an HTTP reply.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    /// A fault with an application-chosen status and a user-facing message.
    #[error("{message}")]
    Classified { status: StatusCode, message: String },
    /// Anything else. Always reported as 500.
    #[error("{message}")]
    Unclassified { message: String },
}

impl CommandError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Classified {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Classified {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::Unclassified {
            message: message.into(),
        }
    }

    /// HTTP status the wrapper will answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Classified { status, .. } => *status,
            Self::Unclassified { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
