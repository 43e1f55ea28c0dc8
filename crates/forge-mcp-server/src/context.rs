//! Per-call invocation context
//!
//! In HTTP mode the inbound `Authorization` header is captured by [`capture_authorization`]
//! before rmcp dispatches the request, and later read back from the request parts that rmcp
//! attaches to each call.

use axum::{extract::Request, middleware::Next, response::Response};
use http::header::AUTHORIZATION;
use rmcp::model::{Extensions, JsonObject};
use tracing::warn;

use crate::credential::Credential;

/// Credential forwarded from an inbound `Authorization` header
#[derive(Debug, Clone)]
pub struct PassThroughCredential(pub Credential);

/// Everything a tool handler needs to know about one call
#[derive(Debug, Default)]
pub struct InvocationContext {
    /// Arguments supplied by the caller
    pub arguments: JsonObject,

    /// Credential forwarded by the transport, if any
    pub credential: Option<Credential>,
}

impl InvocationContext {
    pub fn new(arguments: Option<JsonObject>) -> Self {
        Self {
            arguments: arguments.unwrap_or_default(),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    /// Build the context for a call, picking up any credential captured by the HTTP transport.
    pub fn from_request(arguments: Option<JsonObject>, extensions: &Extensions) -> Self {
        let credential = extensions
            .get::<axum::http::request::Parts>()
            .and_then(|parts| parts.extensions.get::<PassThroughCredential>())
            .map(|PassThroughCredential(credential)| credential.clone());

        Self::new(arguments).with_credential(credential)
    }
}

/// Middleware attaching the inbound `Authorization` header to the request extensions
pub async fn capture_authorization(mut request: Request, next: Next) -> Response {
    if let Some(value) = request.headers().get(AUTHORIZATION) {
        match value.to_str() {
            Ok(value) if !value.trim().is_empty() => {
                let credential = PassThroughCredential(Credential::from_header(value));
                request.extensions_mut().insert(credential);
            }
            Ok(_) => {}
            Err(_) => warn!("Ignoring Authorization header with non-visible characters"),
        }
    }

    next.run(request).await
}
