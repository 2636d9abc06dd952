//! In-memory credential resolver

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{AuthContext, AuthenticationError, CredentialResolver, Credentials, Ext};
use crate::scope::{Scope, ScopeSet};

/// A registered client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEntry {
    pub access_token: String,
    pub scopes: ScopeSet,
    pub expires: DateTime<Utc>,
}

/// Resolver backed by a fixed client table
///
/// Named temporary clients are resolved through the certificate issuer: the
/// issuer's scopes are the starting point and its access token verifies the
/// certificate.
pub struct StaticResolver {
    clients: RwLock<HashMap<String, ClientEntry>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Builder-style registration
    pub fn with_client<I, S>(
        mut self,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
        scopes: I,
        expires: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let client_id = client_id.into();
        let scopes = scopes
            .into_iter()
            .filter_map(|s| match s.as_ref().parse::<Scope>() {
                Ok(scope) => Some(scope),
                Err(e) => {
                    warn!("Dropping scope {:?} of client '{}': {}", s.as_ref(), client_id, e);
                    None
                }
            })
            .collect();
        let entry = ClientEntry {
            access_token: access_token.into(),
            scopes,
            expires,
        };
        self.clients.get_mut().insert(client_id, entry);
        self
    }

    /// Registers or replaces a client
    pub async fn insert(&self, client_id: impl Into<String>, entry: ClientEntry) {
        let mut clients = self.clients.write().await;
        clients.insert(client_id.into(), entry);
    }

    pub async fn remove(&self, client_id: &str) -> Option<ClientEntry> {
        let mut clients = self.clients.write().await;
        clients.remove(client_id)
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialResolver for StaticResolver {
    async fn resolve(&self, auth: &AuthContext) -> Result<Credentials, AuthenticationError> {
        let ext = auth.ext.as_deref().map(Ext::decode).transpose()?.unwrap_or_default();

        let clients = self.clients.read().await;
        let issuer = ext
            .certificate
            .as_ref()
            .and_then(|certificate| certificate.issuer.as_deref());
        let lookup = issuer.unwrap_or(auth.client_id.as_str());
        let entry = clients
            .get(lookup)
            .ok_or_else(|| AuthenticationError::UnknownClient(auth.client_id.clone()))?;

        if entry.expires <= Utc::now() {
            return Err(AuthenticationError::Expired(auth.client_id.clone()));
        }

        let authorized_scopes = ext
            .authorized_scopes
            .map(ScopeSet::parse)
            .transpose()
            .map_err(|e| AuthenticationError::MalformedExt(e.to_string()))?;

        debug!("Resolved credentials for '{}' via '{}'", auth.client_id, lookup);

        Ok(Credentials {
            client_id: auth.client_id.clone(),
            scopes: entry.scopes.clone(),
            expires: entry.expires,
            access_token: Some(entry.access_token.clone()),
            authorized_scopes,
            certificate: ext.certificate,
        })
    }
}
