//! Per-call authorization sessions
//!
//! An [`AuthorizationSession`] is opened for every invocation of an operation.
//! It holds the operation's declared requirement and the caller's effective
//! scopes, and records whether the handler actually discharged the
//! requirement. The calling infrastructure inspects it once at call exit with
//! [`AuthorizationSession::finish`].
//!
//! ```
//! use cretoai_scopes::credentials::Caller;
//! use cretoai_scopes::expression::{Params, ScopeExpression};
//! use cretoai_scopes::scope::ScopeSet;
//! use cretoai_scopes::session::{AuthorizationSession, AuthorizeOutcome};
//!
//! let caller = Caller {
//!     client_id: "test-client".to_string(),
//!     scopes: ScopeSet::parse(["service:magic"]).unwrap(),
//!     expires: None,
//!     authentication_error: None,
//! };
//! let requirement = ScopeExpression::all_of([ScopeExpression::literal("service:<p>")]);
//! let mut session = AuthorizationSession::new("getMagic", Some(requirement), caller);
//!
//! let outcome = session.authorize(Params::new().with("p", "magic")).unwrap();
//! assert_eq!(outcome, AuthorizeOutcome::Satisfied);
//! assert!(session.finish().is_ok());
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::credentials::Caller;
use crate::error::{AuthzError, Denial, ProgrammingError, Result};
use crate::expression::{evaluate, expand, Params, ScopeExpression};
use crate::scope::ScopeSet;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Requirement not discharged yet
    Open,

    /// Requirement evaluated and satisfied
    Discharged,

    /// An evaluation came out unsatisfied; terminal
    Failed,
}

/// Result of a successful `authorize` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// The requirement was fully resolved and is satisfied
    Satisfied,

    /// More parameters are needed before the requirement can be decided
    Incomplete { missing: BTreeSet<String> },
}

impl AuthorizeOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Authorization state of a single operation invocation
#[derive(Debug)]
pub struct AuthorizationSession {
    endpoint: String,
    requirement: Option<ScopeExpression>,
    caller: Caller,

    /// Parameters accumulated for the current, not yet decided, set
    pending: Params,

    state: SessionState,
    denial: Option<Denial>,
    deprecated_check: bool,
}

impl AuthorizationSession {
    pub fn new(
        endpoint: impl Into<String>,
        requirement: Option<ScopeExpression>,
        caller: Caller,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            requirement,
            caller,
            pending: Params::new(),
            state: SessionState::Open,
            denial: None,
            deprecated_check: false,
        }
    }

    /// Supplies parameters and tries to discharge the requirement
    ///
    /// Parameters accumulate across calls until the requirement is fully
    /// resolved. Once a resolved set has been decided the next call starts a
    /// fresh set, so a handler can authorize several parameter sets in turn.
    ///
    /// # Errors
    ///
    /// * `AuthzError::Denied` when the resolved requirement is not satisfied,
    ///   and on every call after that
    /// * `AuthzError::Programming` when no requirement is declared, a pending
    ///   parameter is redefined, or a parameter has the wrong type
    pub fn authorize(&mut self, params: Params) -> Result<AuthorizeOutcome> {
        let Some(requirement) = &self.requirement else {
            return Err(ProgrammingError::NoRequirement {
                endpoint: self.endpoint.clone(),
            }
            .into());
        };

        if let Some(denial) = &self.denial {
            return Err(self.rejection(denial));
        }

        self.pending.merge(params)?;
        let expansion = expand(requirement, &self.pending)?;

        if !expansion.is_complete() {
            debug!(
                "'{}' waiting for parameters {:?}",
                self.endpoint, expansion.missing
            );
            return Ok(AuthorizeOutcome::Incomplete {
                missing: expansion.missing,
            });
        }

        self.pending = Params::new();

        if evaluate(&expansion.expression, &self.caller.scopes) {
            info!(
                "'{}' authorized for client '{}'",
                self.endpoint, self.caller.client_id
            );
            self.state = SessionState::Discharged;
            return Ok(AuthorizeOutcome::Satisfied);
        }

        let denial = Denial {
            client_id: self.caller.client_id.clone(),
            required: expansion.expression,
            scopes: self.caller.scopes.clone(),
        };
        warn!("'{}' denied: {}", self.endpoint, denial);
        self.state = SessionState::Failed;
        let error = self.rejection(&denial);
        self.denial = Some(denial);
        Err(error)
    }

    /// A denial for a caller whose credentials were rejected is reported as
    /// the authentication failure
    fn rejection(&self, denial: &Denial) -> AuthzError {
        match &self.caller.authentication_error {
            Some(e) => AuthzError::Authentication(e.clone()),
            None => denial.clone().into(),
        }
    }

    /// Direct scope check, permanently disabled
    ///
    /// Always fails with a programming error and marks the session, so the
    /// call ends as an internal error even if the handler swallows the error.
    #[deprecated(note = "use authorize() so the check is recorded")]
    pub fn satisfies<I, S>(&mut self, _scopes: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.deprecated_check = true;
        Err(ProgrammingError::DeprecatedSatisfies.into())
    }

    /// Decides the outcome of the call at exit
    ///
    /// Requirements that are absent or `AllOf[]` need no discharge. A
    /// declared requirement that was never discharged, or a parameter set
    /// left undecided, is a programming error. A session that failed an
    /// evaluation reports the denial.
    pub fn finish(&self) -> Result<()> {
        if self.deprecated_check {
            return Err(ProgrammingError::DeprecatedSatisfies.into());
        }

        let Some(requirement) = &self.requirement else {
            return Ok(());
        };
        if requirement.is_trivial() {
            return Ok(());
        }

        match self.state {
            SessionState::Discharged if self.pending.is_empty() => Ok(()),
            SessionState::Discharged => {
                warn!(
                    "'{}' left parameters {:?} undecided",
                    self.endpoint,
                    self.pending.iter().map(|(name, _)| name).collect::<Vec<_>>()
                );
                Err(ProgrammingError::NeverDischarged {
                    endpoint: self.endpoint.clone(),
                }
                .into())
            }
            SessionState::Failed => match &self.denial {
                Some(denial) => Err(self.rejection(denial)),
                None => Err(ProgrammingError::NeverDischarged {
                    endpoint: self.endpoint.clone(),
                }
                .into()),
            },
            SessionState::Open => Err(ProgrammingError::NeverDischarged {
                endpoint: self.endpoint.clone(),
            }
            .into()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn requirement(&self) -> Option<&ScopeExpression> {
        self.requirement.as_ref()
    }

    pub fn client_id(&self) -> &str {
        &self.caller.client_id
    }

    /// Effective scopes after narrowing
    pub fn scopes(&self) -> &ScopeSet {
        &self.caller.scopes
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.caller.expires
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` if the disabled `satisfies` check was invoked
    pub fn used_deprecated_check(&self) -> bool {
        self.deprecated_check
    }
}
