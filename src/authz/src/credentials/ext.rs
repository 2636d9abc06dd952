//! Request extension data
//!
//! Callers attach a base64-encoded JSON object to a signed request to narrow
//! their own permissions:
//!
//! ```text
//! {"authorizedScopes": ["queue:create-task:aws/*"], "certificate": {...}}
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::certificate::Certificate;
use super::AuthenticationError;

/// Decoded request extension data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ext {
    /// Restriction the caller declares for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_scopes: Option<Vec<String>>,

    /// Temporary credential certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
}

impl Ext {
    pub fn with_authorized_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_certificate(mut self, certificate: Certificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Decodes the base64 JSON form carried on the request
    pub fn decode(encoded: &str) -> Result<Self, AuthenticationError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| AuthenticationError::MalformedExt(format!("invalid base64: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AuthenticationError::MalformedExt(format!("invalid JSON: {}", e)))
    }

    /// Encodes into the base64 JSON form
    pub fn encode(&self) -> serde_json::Result<String> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_authorized_scopes() {
        let encoded = BASE64.encode(r#"{"authorizedScopes": ["service:ma*"]}"#);
        let ext = Ext::decode(&encoded).unwrap();
        assert_eq!(ext.authorized_scopes, Some(vec!["service:ma*".to_string()]));
        assert!(ext.certificate.is_none());
    }

    #[test]
    fn test_encode_decode() {
        let ext = Ext::default().with_authorized_scopes(["a", "b*"]);
        assert_eq!(Ext::decode(&ext.encode().unwrap()).unwrap(), ext);
    }

    #[test]
    fn test_malformed_ext() {
        assert!(matches!(
            Ext::decode("%%%"),
            Err(AuthenticationError::MalformedExt(_))
        ));
        assert!(matches!(
            Ext::decode(&BASE64.encode("[1, 2]")),
            Err(AuthenticationError::MalformedExt(_))
        ));
    }
}
