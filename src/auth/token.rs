//! Signed bearer tokens (HS256 JWTs).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// What a successful verification yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub subject: String,
    pub expires_at: i64,
}

/// Checks a bearer credential's signature and expiry.
pub trait CredentialVerifier {
    /// Returns `None` for any token that is malformed, expired or signed
    /// with a different secret.
    fn verify(&self, token: &str) -> Option<VerifiedCredential>;
}

/// Issues and verifies access tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs,
        }
    }

    /// Issue a token for `user_id` valid from now for the configured TTL.
    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, Utc::now().timestamp())
    }

    /// Issue a token as if it had been created at `issued_at` (unix seconds).
    pub fn issue_at(&self, user_id: i64, email: &str, issued_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: issued_at,
            exp: issued_at + self.ttl_secs,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }
}

impl CredentialVerifier for TokenService {
    fn verify(&self, token: &str) -> Option<VerifiedCredential> {
        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(VerifiedCredential {
                subject: data.claims.sub,
                expires_at: data.claims.exp,
            }),
            Err(err) => {
                debug!(error = %err, "rejected bearer token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn issued_token_verifies() {
        let tokens = TokenService::new(SECRET, 3600);
        let token = tokens.issue(42, "a@example.com").unwrap();

        let verified = tokens.verify(&token).unwrap();
        assert_eq!(verified.subject, "42");
        assert!(verified.expires_at > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(SECRET, 60);
        let issued_at = Utc::now().timestamp() - 3600;
        let token = tokens.issue_at(42, "a@example.com", issued_at).unwrap();

        assert!(tokens.verify(&token).is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let ours = TokenService::new(SECRET, 3600);
        let theirs = TokenService::new(b"another-secret", 3600);
        let token = theirs.issue(42, "a@example.com").unwrap();

        assert!(ours.verify(&token).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = TokenService::new(SECRET, 3600);
        assert!(tokens.verify("not-a-jwt").is_none());
        assert!(tokens.verify("").is_none());
    }
}
