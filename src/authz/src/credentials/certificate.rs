//! Temporary credential certificates
//!
//! A certificate restricts a client's scopes for a bounded time window. It is
//! signed with HMAC-SHA256 under the client's long-term access token, and the
//! temporary access token is derived from the same key and the certificate
//! seed, so only the holder of the long-term token can mint either.

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::scope::ScopeSet;

type HmacSha256 = Hmac<Sha256>;

/// The only certificate format version
pub const CERTIFICATE_VERSION: u32 = 1;

/// Length of a seed made of two 22-character slugs
pub const SEED_LENGTH: usize = 44;

/// Longest validity window a certificate may declare
pub fn max_certificate_lifetime() -> Duration {
    Duration::days(31)
}

/// Reasons a certificate is not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    #[error("unsupported certificate version {0}")]
    UnsupportedVersion(u32),

    #[error("certificate seed must be {SEED_LENGTH} characters")]
    InvalidSeed,

    #[error("certificate start must be before its expiry")]
    InvalidWindow,

    #[error("certificate validity window exceeds 31 days")]
    TooLong,

    #[error("certificate is not valid yet")]
    NotYetValid,

    #[error("certificate has expired")]
    Expired,

    #[error("certificate contains an invalid scope: {0}")]
    InvalidScope(String),

    #[error("certificate signature is invalid")]
    InvalidSignature,

    #[error("no access token available to verify the certificate")]
    MissingAccessToken,
}

/// A signed, time-bounded scope restriction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub version: u32,

    pub scopes: Vec<String>,

    /// Start of the validity window, milliseconds since the epoch
    pub start: i64,

    /// End of the validity window, milliseconds since the epoch
    pub expiry: i64,

    pub seed: String,

    /// Base64 HMAC-SHA256 over the certificate content
    pub signature: String,

    /// Client that issued the certificate for a named temporary client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl Certificate {
    /// Issues a certificate signed with `access_token`
    ///
    /// # Arguments
    ///
    /// * `access_token` - Long-term access token of the issuing client
    /// * `scopes` - Scopes the temporary credentials are restricted to
    /// * `start` - Start of the validity window
    /// * `expiry` - End of the validity window
    pub fn issue(
        access_token: &str,
        scopes: &ScopeSet,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<Self, CertificateError> {
        if start >= expiry {
            return Err(CertificateError::InvalidWindow);
        }
        if expiry - start > max_certificate_lifetime() {
            return Err(CertificateError::TooLong);
        }

        let mut certificate = Self {
            version: CERTIFICATE_VERSION,
            scopes: scopes.to_strings(),
            start: start.timestamp_millis(),
            expiry: expiry.timestamp_millis(),
            seed: new_seed(),
            signature: String::new(),
            issuer: None,
        };
        certificate.signature = BASE64.encode(certificate.mac(access_token, None).finalize().into_bytes());

        Ok(certificate)
    }

    /// Issues a certificate for the named client `client_id` on behalf of
    /// `issuer`, signed with the issuer's access token
    pub fn issue_named(
        issuer: &str,
        issuer_access_token: &str,
        client_id: &str,
        scopes: &ScopeSet,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<Self, CertificateError> {
        let mut certificate = Self::issue(issuer_access_token, scopes, start, expiry)?;
        certificate.issuer = Some(issuer.to_string());
        certificate.signature = BASE64.encode(
            certificate
                .mac(issuer_access_token, Some(client_id))
                .finalize()
                .into_bytes(),
        );
        Ok(certificate)
    }

    /// Verifies the certificate and returns its scope set
    ///
    /// # Arguments
    ///
    /// * `access_token` - Access token of the client that signed it (the
    ///   issuer for named certificates)
    /// * `client_id` - Client presenting the certificate
    /// * `now` - Time the window is checked against
    pub fn verify(
        &self,
        access_token: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScopeSet, CertificateError> {
        if self.version != CERTIFICATE_VERSION {
            return Err(CertificateError::UnsupportedVersion(self.version));
        }
        if self.seed.len() != SEED_LENGTH {
            return Err(CertificateError::InvalidSeed);
        }
        if self.start >= self.expiry {
            return Err(CertificateError::InvalidWindow);
        }
        match self.expiry.checked_sub(self.start) {
            Some(length) if length <= max_certificate_lifetime().num_milliseconds() => {}
            _ => return Err(CertificateError::TooLong),
        }

        let now = now.timestamp_millis();
        if now < self.start {
            return Err(CertificateError::NotYetValid);
        }
        if now > self.expiry {
            return Err(CertificateError::Expired);
        }

        let scopes = ScopeSet::parse(&self.scopes)
            .map_err(|e| CertificateError::InvalidScope(e.to_string()))?;

        let signature = BASE64
            .decode(&self.signature)
            .map_err(|_| CertificateError::InvalidSignature)?;
        let named = self.issuer.as_ref().map(|_| client_id);
        self.mac(access_token, named)
            .verify_slice(&signature)
            .map_err(|_| CertificateError::InvalidSignature)?;

        Ok(scopes)
    }

    /// End of the validity window
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.expiry).single()
    }

    /// HMAC over the newline-joined signing content
    fn mac(&self, access_token: &str, client_id: Option<&str>) -> HmacSha256 {
        let mut lines = vec![format!("version:{}", self.version)];
        if let (Some(client_id), Some(issuer)) = (client_id, &self.issuer) {
            lines.push(format!("clientId:{}", client_id));
            lines.push(format!("issuer:{}", issuer));
        }
        lines.push(format!("seed:{}", self.seed));
        lines.push(format!("start:{}", self.start));
        lines.push(format!("expiry:{}", self.expiry));
        lines.push("scopes:".to_string());
        lines.extend(self.scopes.iter().cloned());

        let mut mac = HmacSha256::new_from_slice(access_token.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(lines.join("\n").as_bytes());
        mac
    }
}

/// Derives the temporary access token that goes with a certificate seed
///
/// Base64url without padding of HMAC-SHA256(access_token, seed).
pub fn temporary_access_token(access_token: &str, seed: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(access_token.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(seed.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

fn new_seed() -> String {
    format!(
        "{}{}",
        URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes()),
        URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::minutes(1), now + Duration::minutes(5))
    }

    fn magic() -> ScopeSet {
        ScopeSet::parse(["service:mag*"]).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let (start, expiry) = window();
        let certificate = Certificate::issue("groupie", &magic(), start, expiry).unwrap();

        assert_eq!(certificate.seed.len(), SEED_LENGTH);
        let scopes = certificate.verify("groupie", "rockstar", Utc::now()).unwrap();
        assert_eq!(scopes, magic());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (start, expiry) = window();
        let certificate = Certificate::issue("groupie", &magic(), start, expiry).unwrap();

        assert_eq!(
            certificate.verify("not-the-key", "rockstar", Utc::now()),
            Err(CertificateError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_scopes_rejected() {
        let (start, expiry) = window();
        let mut certificate = Certificate::issue("groupie", &magic(), start, expiry).unwrap();
        certificate.scopes = vec!["*".to_string()];

        assert_eq!(
            certificate.verify("groupie", "rockstar", Utc::now()),
            Err(CertificateError::InvalidSignature)
        );
    }

    #[test]
    fn test_window_enforced() {
        let (start, expiry) = window();
        let certificate = Certificate::issue("groupie", &magic(), start, expiry).unwrap();

        assert_eq!(
            certificate.verify("groupie", "rockstar", expiry + Duration::seconds(1)),
            Err(CertificateError::Expired)
        );
        assert_eq!(
            certificate.verify("groupie", "rockstar", start - Duration::seconds(1)),
            Err(CertificateError::NotYetValid)
        );
    }

    #[test]
    fn test_extreme_window_rejected() {
        let (start, expiry) = window();
        let mut certificate = Certificate::issue("groupie", &magic(), start, expiry).unwrap();
        certificate.start = i64::MIN;
        certificate.expiry = i64::MAX;

        assert_eq!(
            certificate.verify("groupie", "rockstar", Utc::now()),
            Err(CertificateError::TooLong)
        );
    }

    #[test]
    fn test_issue_rejects_long_or_inverted_windows() {
        let now = Utc::now();
        assert_eq!(
            Certificate::issue("k", &magic(), now, now + Duration::days(32)),
            Err(CertificateError::TooLong)
        );
        assert_eq!(
            Certificate::issue("k", &magic(), now, now),
            Err(CertificateError::InvalidWindow)
        );
    }

    #[test]
    fn test_named_certificate_binds_client_id() {
        let (start, expiry) = window();
        let certificate =
            Certificate::issue_named("rockstar", "groupie", "rockstar/temp", &magic(), start, expiry)
                .unwrap();

        assert!(certificate.verify("groupie", "rockstar/temp", Utc::now()).is_ok());
        assert_eq!(
            certificate.verify("groupie", "someone-else", Utc::now()),
            Err(CertificateError::InvalidSignature)
        );
    }

    #[test]
    fn test_temporary_access_token_is_url_safe() {
        let seed = new_seed();
        let token = temporary_access_token("groupie", &seed);

        assert_eq!(token.len(), 43);
        assert!(!token.contains(['+', '/', '=']));
        assert_eq!(token, temporary_access_token("groupie", &seed));
        assert_ne!(token, temporary_access_token("other", &seed));
    }
}
