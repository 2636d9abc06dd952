//! Operation handlers

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use super::config::ServiceContext;
use crate::credentials::AuthContext;
use crate::error::AuthzError;
use crate::expression::Params;
use crate::session::AuthorizationSession;

/// An incoming call as seen by a handler
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    /// Route parameters
    pub params: BTreeMap<String, String>,

    /// Request body
    pub payload: Value,

    /// `None` for unauthenticated requests
    pub auth: Option<AuthContext>,
}

impl CallRequest {
    pub fn new() -> Self {
        Self {
            payload: Value::Object(Map::new()),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Route parameters as scope expression parameters
    pub fn route_params(&self) -> Params {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Ways a handler can end a call other than success
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Denial or programming error from the authorization session
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Error reported under a code from the API's error table
    #[error("{code}: {message}")]
    Reported {
        code: String,
        message: String,
        details: Value,
    },

    /// Unexpected fault, reported as an opaque internal error
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    /// Reports `code` with a message template rendered against `details`
    pub fn report(code: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        Self::Reported {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

/// Result of a handler; the value is the JSON response body
pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// Implementation of one operation
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles a call; declared requirements must be discharged through
    /// `session` before returning success
    async fn handle(
        &self,
        request: &CallRequest,
        session: &mut AuthorizationSession,
        context: &ServiceContext,
    ) -> HandlerResult;
}

/// Handler backed by a synchronous closure
pub struct FnHandler<F> {
    f: F,
}

/// Wraps a closure as a [`Handler`]
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&CallRequest, &mut AuthorizationSession, &ServiceContext) -> HandlerResult
        + Send
        + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&CallRequest, &mut AuthorizationSession, &ServiceContext) -> HandlerResult
        + Send
        + Sync,
{
    async fn handle(
        &self,
        request: &CallRequest,
        session: &mut AuthorizationSession,
        context: &ServiceContext,
    ) -> HandlerResult {
        (self.f)(request, session, context)
    }
}
