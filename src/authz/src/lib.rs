//! # CretoAI Scope Authorization
//!
//! Scope-based authorization for API operations.
//!
//! ## Features
//!
//! - **Scope matching** with trailing-`*` prefix wildcards
//! - **Scope expressions** (`AllOf`, `AnyOf`, `for/in/each`, `if/then`)
//!   validated when an endpoint is declared
//! - **Per-call authorization sessions** that fail loudly when a handler
//!   never checks its declared requirement
//! - **Credential narrowing** through signed temporary certificates and
//!   caller-declared `authorizedScopes`
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::{Duration, Utc};
//! use cretoai_scopes::api::{handler_fn, Api, ApiConfig, CallRequest, Endpoint, ServiceContext};
//! use cretoai_scopes::credentials::{AuthContext, StaticResolver};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut api = Api::new(ApiConfig::new("Queue", "Task queue"));
//!
//!     api.declare(
//!         Endpoint::new("createTask")
//!             .with_scopes(json!({"AllOf": ["queue:create-task:<provisionerId>"]})),
//!         handler_fn(|request, session, _context| {
//!             session.authorize(request.route_params())?;
//!             Ok(json!({"ok": true}))
//!         }),
//!     )?;
//!
//!     let resolver = StaticResolver::new().with_client(
//!         "worker",
//!         "secret",
//!         ["queue:create-task:aws"],
//!         Utc::now() + Duration::days(1),
//!     );
//!     let service = api.build(Arc::new(resolver), ServiceContext::new())?;
//!
//!     let request = CallRequest::new()
//!         .with_param("provisionerId", "aws")
//!         .with_auth(AuthContext::new("worker"));
//!     let response = service.call("createTask", request).await;
//!
//!     assert!(response.is_success());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod credentials;
pub mod error;
pub mod expression;
pub mod scope;
pub mod session;

pub use api::{Api, ApiConfig, ApiService, Endpoint};
pub use credentials::{Caller, CredentialResolver, Credentials};
pub use error::{AuthzError, Denial, ProgrammingError, Result};
pub use expression::{Params, ScopeExpression};
pub use scope::{Scope, ScopeSet};
pub use session::{AuthorizationSession, AuthorizeOutcome, SessionState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
