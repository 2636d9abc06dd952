//! Caller credentials
//!
//! A [`CredentialResolver`] turns the authentication data of a request into
//! [`Credentials`]: the client's granted scopes plus whatever restrictions the
//! request carries. [`Credentials::narrow`] applies those restrictions and
//! yields the [`Caller`] an authorization session decides against.

mod certificate;
mod ext;
mod resolver;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::scope::ScopeSet;

pub use certificate::{
    max_certificate_lifetime, temporary_access_token, Certificate, CertificateError,
    CERTIFICATE_VERSION, SEED_LENGTH,
};
pub use ext::Ext;
pub use resolver::{ClientEntry, StaticResolver};

/// Client id reported for requests that carry no credentials at all
pub const NO_AUTH: &str = "no-auth";

/// Authentication data attached to a request
///
/// Transport-level verification (request signing) has already happened by
/// the time an `AuthContext` is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub client_id: String,

    /// Base64 JSON extension data, see [`Ext`]
    pub ext: Option<String>,
}

impl AuthContext {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ext: None,
        }
    }

    pub fn with_ext(mut self, ext: &Ext) -> serde_json::Result<Self> {
        self.ext = Some(ext.encode()?);
        Ok(self)
    }

    /// Attaches an already encoded extension blob
    pub fn with_raw_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }
}

/// Authentication failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("unknown client '{0}'")]
    UnknownClient(String),

    #[error("malformed ext: {0}")]
    MalformedExt(String),

    #[error("credentials for '{0}' have expired")]
    Expired(String),
}

impl AuthenticationError {
    /// Short reason reported in the `auth-failed:<reason>` client id
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::UnknownClient(_) => "unknown-client",
            Self::MalformedExt(_) => "malformed-ext",
            Self::Expired(_) => "expired",
        }
    }
}

/// Resolved credentials before request restrictions are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,

    /// Scopes granted to the client
    pub scopes: ScopeSet,

    /// Expiry of the client's credentials
    pub expires: DateTime<Utc>,

    /// Key the certificate signature is checked with: the client's own
    /// access token, or the issuer's for named temporary clients
    pub access_token: Option<String>,

    /// Restriction declared by the caller on this request
    pub authorized_scopes: Option<ScopeSet>,

    /// Temporary credential certificate presented with the request
    pub certificate: Option<Certificate>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, scopes: ScopeSet, expires: DateTime<Utc>) -> Self {
        Self {
            client_id: client_id.into(),
            scopes,
            expires,
            access_token: None,
            authorized_scopes: None,
            certificate: None,
        }
    }

    /// Applies the certificate and then the declared restriction
    ///
    /// A certificate that fails verification leaves the caller with no
    /// scopes at all. A valid certificate also caps `expires` at the end of
    /// its window.
    pub fn narrow(self, now: DateTime<Utc>) -> Caller {
        let mut scopes = self.scopes;
        let mut expires = self.expires;

        if let Some(certificate) = &self.certificate {
            let verified = match &self.access_token {
                Some(key) => certificate.verify(key, &self.client_id, now),
                None => Err(CertificateError::MissingAccessToken),
            };

            match verified {
                Ok(allowed) => {
                    scopes = scopes.narrow(&allowed);
                    if let Some(end) = certificate.expires_at() {
                        expires = expires.min(end);
                    }
                    debug!("Certificate narrowed '{}' to {}", self.client_id, scopes);
                }
                Err(e) => {
                    warn!("Rejected certificate for '{}': {}", self.client_id, e);
                    scopes = ScopeSet::new();
                }
            }
        }

        if let Some(authorized) = &self.authorized_scopes {
            scopes = scopes.narrow(authorized);
            debug!("authorizedScopes narrowed '{}' to {}", self.client_id, scopes);
        }

        Caller {
            client_id: self.client_id,
            scopes,
            expires: Some(expires),
            authentication_error: None,
        }
    }
}

/// The identity and effective scopes a request is authorized as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub client_id: String,

    /// Effective scopes after all narrowing
    pub scopes: ScopeSet,

    /// `None` for unauthenticated callers
    pub expires: Option<DateTime<Utc>>,

    /// Why the presented credentials could not be resolved
    pub authentication_error: Option<AuthenticationError>,
}

impl Caller {
    /// A caller without credentials, identified as `auth-failed:<reason>`
    pub fn unauthenticated(reason: &str) -> Self {
        Self {
            client_id: format!("auth-failed:{}", reason),
            scopes: ScopeSet::new(),
            expires: None,
            authentication_error: None,
        }
    }

    /// A caller whose credentials were presented but rejected
    pub fn failed_authentication(error: AuthenticationError) -> Self {
        Self {
            authentication_error: Some(error.clone()),
            ..Self::unauthenticated(error.reason_code())
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.expires.is_some()
    }
}

/// Source of client credentials
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolves the credentials and request restrictions for `auth`
    async fn resolve(&self, auth: &AuthContext) -> Result<Credentials, AuthenticationError>;
}
