//! Declaration surface and call lifecycle
//!
//! An [`Api`] collects endpoint declarations, validating each scope
//! requirement as it is declared. [`Api::build`] binds the declarations to a
//! credential resolver and a service context, producing an [`ApiService`]
//! whose [`ApiService::call`] runs one request through credential narrowing,
//! the handler and the exit check of its authorization session.

mod config;
mod handler;
mod reply;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub use config::{ApiConfig, ServiceContext};
pub use handler::{handler_fn, CallRequest, FnHandler, Handler, HandlerError, HandlerResult};
pub use reply::{ApiResponse, ErrorCodes, ErrorReply, ErrorReporter, RequestInfo};

use crate::credentials::{Caller, CredentialResolver, NO_AUTH};
use crate::error::{AuthzError, ProgrammingError};
use crate::expression::{Params, ScopeExpression};
use crate::session::AuthorizationSession;

/// Transformation applied to a payload before it appears in error replies
pub type PayloadCleaner = fn(Value) -> Value;

/// Declaration of one operation
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,

    /// Scope requirement in its JSON declaration form
    pub scopes: Option<Value>,

    /// Hides sensitive payload members from error replies
    pub clean_payload: Option<PayloadCleaner>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scopes: None,
            clean_payload: None,
        }
    }

    pub fn with_scopes(mut self, scopes: Value) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn with_clean_payload(mut self, clean: PayloadCleaner) -> Self {
        self.clean_payload = Some(clean);
        self
    }
}

struct DeclaredEndpoint {
    requirement: Option<ScopeExpression>,
    clean_payload: Option<PayloadCleaner>,
    handler: Arc<dyn Handler>,
}

/// Collection of endpoint declarations
pub struct Api {
    config: ApiConfig,
    endpoints: HashMap<String, DeclaredEndpoint>,
}

impl Api {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            endpoints: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Declares an endpoint
    ///
    /// # Errors
    ///
    /// * `InvalidDeclaration` if the scope requirement has an unsupported
    ///   shape
    /// * `DuplicateEndpoint` if the name is already declared
    pub fn declare<H>(&mut self, endpoint: Endpoint, handler: H) -> Result<(), ProgrammingError>
    where
        H: Handler + 'static,
    {
        if self.endpoints.contains_key(&endpoint.name) {
            return Err(ProgrammingError::DuplicateEndpoint(endpoint.name));
        }

        let requirement = endpoint
            .scopes
            .as_ref()
            .map(ScopeExpression::from_declaration)
            .transpose()
            .map_err(|source| ProgrammingError::InvalidDeclaration {
                endpoint: endpoint.name.clone(),
                source,
            })?;

        debug!(
            "Declared '{}' requiring {}",
            endpoint.name,
            requirement
                .as_ref()
                .map_or_else(|| "nothing".to_string(), ToString::to_string)
        );

        self.endpoints.insert(
            endpoint.name,
            DeclaredEndpoint {
                requirement,
                clean_payload: endpoint.clean_payload,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Binds the declarations to a resolver and context
    ///
    /// # Errors
    ///
    /// `MissingContext` if `context` lacks a property the config requires
    pub fn build(
        self,
        resolver: Arc<dyn CredentialResolver>,
        context: ServiceContext,
    ) -> Result<ApiService, ProgrammingError> {
        context.validate(&self.config.context)?;

        info!(
            "Built '{}' with {} endpoints",
            self.config.title,
            self.endpoints.len()
        );

        Ok(ApiService {
            error_codes: ErrorCodes::with_extra(&self.config.error_codes),
            config: self.config,
            endpoints: self.endpoints,
            resolver,
            context,
        })
    }
}

/// A running API; immutable and shared by all calls
pub struct ApiService {
    config: ApiConfig,
    error_codes: ErrorCodes,
    endpoints: HashMap<String, DeclaredEndpoint>,
    resolver: Arc<dyn CredentialResolver>,
    context: ServiceContext,
}

impl ApiService {
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    /// Requirement declared for an endpoint
    pub fn requirement(&self, endpoint: &str) -> Option<&ScopeExpression> {
        self.endpoints
            .get(endpoint)
            .and_then(|declared| declared.requirement.as_ref())
    }

    /// Resolves the effective caller of a request
    ///
    /// Requests without credentials, and requests whose credentials cannot
    /// be resolved, proceed as `auth-failed:<reason>` with no scopes.
    pub async fn caller(&self, request: &CallRequest) -> Caller {
        let Some(auth) = &request.auth else {
            return Caller::unauthenticated(NO_AUTH);
        };

        match self.resolver.resolve(auth).await {
            Ok(credentials) => credentials.narrow(Utc::now()),
            Err(e) => {
                warn!("Authentication failed for '{}': {}", auth.client_id, e);
                Caller::failed_authentication(e)
            }
        }
    }

    /// Runs one call of `endpoint`
    pub async fn call(&self, endpoint: &str, request: CallRequest) -> ApiResponse {
        let params = json!(request.params);
        let Some(declared) = self.endpoints.get(endpoint) else {
            let reporter = ErrorReporter::new(
                &self.error_codes,
                RequestInfo::new(endpoint, params, request.payload.clone()),
            );
            return reporter.report(
                "ResourceNotFound",
                &ProgrammingError::UnknownEndpoint(endpoint.to_string()).to_string(),
                json!({}),
            );
        };

        let payload = match declared.clean_payload {
            Some(clean) => clean(request.payload.clone()),
            None => request.payload.clone(),
        };
        let reporter = ErrorReporter::new(
            &self.error_codes,
            RequestInfo::new(endpoint, params, payload),
        );

        let caller = self.caller(&request).await;
        let mut session = AuthorizationSession::new(endpoint, declared.requirement.clone(), caller);

        // Requirements without parameters are decided before the handler runs.
        if let Some(requirement) = &declared.requirement {
            if requirement.is_static() && !requirement.is_trivial() {
                if let Err(e) = session.authorize(Params::new()) {
                    return self.report_authz(&reporter, e);
                }
            }
        }

        let result = declared
            .handler
            .handle(&request, &mut session, &self.context)
            .await;

        match result {
            Ok(body) => match session.finish() {
                Ok(()) => {
                    debug!("'{}' succeeded for '{}'", endpoint, session.client_id());
                    ApiResponse::ok(body)
                }
                Err(e) => self.report_authz(&reporter, e),
            },
            Err(HandlerError::Reported {
                code,
                message,
                details,
            }) => reporter.report(&code, &message, details),
            Err(HandlerError::Authz(e)) => self.report_authz(&reporter, e),
            Err(HandlerError::Internal(e)) => reporter.report_internal(&format!("{:#}", e)),
        }
    }

    fn report_authz(&self, reporter: &ErrorReporter<'_>, error: AuthzError) -> ApiResponse {
        match error {
            AuthzError::Denied(denial) => {
                let template = format!(
                    "Client ID {} does not have sufficient scopes.\n\n",
                    denial.client_id
                ) + "This request requires the client to satisfy the scope expression:\n\n{{required}}\n\n"
                    + "The client has the scopes:\n\n{{scopes}}";
                reporter.report(
                    "InsufficientScopes",
                    &template,
                    json!({
                        "clientId": denial.client_id,
                        "required": denial.required,
                        "scopes": denial.scopes,
                    }),
                )
            }
            AuthzError::Authentication(e) => {
                reporter.report("AuthenticationFailed", &e.to_string(), json!({}))
            }
            AuthzError::Programming(e) => reporter.report_internal(&e),
        }
    }
}
