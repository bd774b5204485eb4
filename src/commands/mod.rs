//! Slash command infrastructure.
//!
//! Each command implements [`CommandHandler`]. The [`CommandRegistry`] is
//! composed once at startup from a fixed list and handed to the dispatcher;
//! nothing registers commands after the listener starts.

use std::collections::HashMap;
use std::sync::Arc;

use axum::response::Response;

use crate::context::RequestContext;
use crate::delivery::{Rendered, Responder};
use crate::dispatch::CommandForm;
use crate::error::CommandError;
use crate::quote::QuoteClient;

pub mod spoiler;
pub mod ticker;

use self::spoiler::SpoilerCommand;
use self::ticker::TickerCommand;

/// Everything a handler may look at while serving one invocation.
pub struct Invocation<'a> {
    pub context: &'a RequestContext,
    pub form: &'a CommandForm,
    pub responder: &'a Responder,
}

impl Invocation<'_> {
    /// Hand `render` to the responder, inline or deferred per configuration.
    pub async fn deliver<F>(&self, render: F) -> Result<Response, CommandError>
    where
        F: std::future::Future<Output = Rendered> + Send + 'static,
    {
        self.responder
            .deliver(
                self.context.request_id,
                self.form.response_url.as_deref(),
                render,
            )
            .await
    }
}

/// Trait implemented by all commands. Returning an error leaves the HTTP
/// status to the request wrapper.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, invocation: &Invocation<'_>) -> Result<Response, CommandError>;
}

/// Command name to handler. Names are stored as given; the dispatcher
/// lower-cases before lookup and callers register lower-case names.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands this service ships with.
    pub fn builtin(quotes: QuoteClient) -> Self {
        Self::from_entries([
            (
                "/ticker",
                Arc::new(TickerCommand::new(quotes)) as Arc<dyn CommandHandler>,
            ),
            (
                "/spoiler",
                Arc::new(SpoilerCommand) as Arc<dyn CommandHandler>,
            ),
        ])
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Arc<dyn CommandHandler>)>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for (name, handler) in entries {
            registry.register(name, handler);
        }
        registry
    }

    /// Register `handler` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!(command = %name, "replacing previously registered command");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
