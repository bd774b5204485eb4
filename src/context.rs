//! Per-request identity.
//!
//! Every request entering `/cmd` is stamped with a [`RequestId`] by the
//! [`assign_request_id`] middleware before the logging wrapper runs. The
//! allocator lives in the router state rather than a global so tests can
//! observe a fresh counter.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

/// Issues process-unique, monotonically increasing request identifiers.
/// The first identifier handed out is 1.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    current: AtomicU64,
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically bump the counter and return the new value.
    pub fn allocate(&self) -> u64 {
        self.current.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Highest identifier issued so far (0 before the first request).
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }
}

/// Request extension carrying the identifier allocated for this request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub u64);

/// Immutable facts about the request being served. Background work copies
/// the fields it needs out of this instead of borrowing it.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: u64,
    pub client_address: String,
}

/// Middleware allocating a [`RequestId`] and attaching it to the request.
pub async fn assign_request_id(
    State(ids): State<Arc<RequestIdAllocator>>,
    mut req: Request,
    next: Next,
) -> Response {
    let id = ids.allocate();
    req.extensions_mut().insert(RequestId(id));
    next.run(req).await
}

/// Resolve the address to log for a request. `X-Real-IP` wins over
/// `X-Forwarded-For`; either one is reported alongside the socket address.
pub fn client_address(headers: &HeaderMap, socket: Option<SocketAddr>) -> String {
    let socket = socket
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let forwarded = ["x-real-ip", "x-forwarded-for"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .find(|v| !v.is_empty());
    match forwarded {
        Some(addr) => format!("{} ({})", addr, socket),
        None => socket,
    }
}
