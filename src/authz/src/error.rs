//! Error types for the authorization engine
//!
//! Two outcomes are kept strictly apart: a caller that does not hold the
//! required scopes ([`AuthzError::Denied`], reported as 403) and a defect in
//! the operation's own declaration or handler ([`AuthzError::Programming`],
//! reported as a generic 500).

use std::fmt;

use thiserror::Error;

use crate::credentials::AuthenticationError;
use crate::expression::{DeclarationError, ScopeExpression};
use crate::scope::ScopeSet;

/// Defects in an operation's declaration or implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgrammingError {
    /// Scope requirement has an unsupported shape
    #[error("invalid scope requirement for '{endpoint}': {source}")]
    InvalidDeclaration {
        endpoint: String,
        #[source]
        source: DeclarationError,
    },

    /// Handler succeeded without discharging a declared requirement
    #[error("'{endpoint}' declares a scope requirement but the handler never satisfied it")]
    NeverDischarged { endpoint: String },

    /// A pending parameter was supplied again with another value
    #[error("parameter '{name}' was already supplied with a different value")]
    ConflictingParameter { name: String },

    /// The deprecated direct scope check was invoked
    #[error("satisfies() is disabled, use authorize() to check scopes")]
    DeprecatedSatisfies,

    /// `if` parameter resolved to something other than a boolean
    #[error("conditional parameter '{name}' must be a boolean, got {found}")]
    NonBooleanCondition { name: String, found: &'static str },

    /// Parameter has the wrong type for where it is used
    #[error("parameter '{name}' must be {expected}, got {found}")]
    ParameterType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// `authorize` called on an operation without a requirement
    #[error("authorize() called but '{endpoint}' declares no scope requirement")]
    NoRequirement { endpoint: String },

    /// Service context lacks properties the API requires
    #[error("missing required context properties: {}", .0.join(", "))]
    MissingContext(Vec<String>),

    /// Two endpoints were declared with the same name
    #[error("endpoint '{0}' is declared more than once")]
    DuplicateEndpoint(String),

    /// No endpoint with this name has been declared
    #[error("no endpoint named '{0}'")]
    UnknownEndpoint(String),
}

/// A completed evaluation that came out unsatisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Client the decision was made for
    pub client_id: String,

    /// Fully expanded requirement that was evaluated
    pub required: ScopeExpression,

    /// Effective scopes the requirement was evaluated against
    pub scopes: ScopeSet,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client '{}' does not satisfy the scope expression {}; it has the scopes {}",
            self.client_id, self.required, self.scopes
        )
    }
}

/// Authorization engine errors
#[derive(Debug, Clone, Error)]
pub enum AuthzError {
    /// Requirement evaluated and not satisfied
    #[error("Authorization denied: {0}")]
    Denied(Box<Denial>),

    /// Defect in the operation, never the caller's fault
    #[error("Programming error: {0}")]
    Programming(#[from] ProgrammingError),

    /// Credentials could not be resolved
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),
}

impl AuthzError {
    /// Returns `true` for an authorization denial
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    /// Returns `true` for a programming error
    pub fn is_programming(&self) -> bool {
        matches!(self, Self::Programming(_))
    }
}

impl From<Denial> for AuthzError {
    fn from(denial: Denial) -> Self {
        Self::Denied(Box::new(denial))
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
