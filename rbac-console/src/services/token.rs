use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TokenSettings;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed token or expired token. Callers treat every
    /// case as "not authenticated".
    #[error("Invalid token")]
    InvalidToken,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Identity embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    /// Role name
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn from_settings(settings: &TokenSettings) -> Self {
        tracing::info!(
            expiry_minutes = settings.expiry_minutes,
            "Token service initialized with HS256 key"
        );
        Self::new(
            settings.signing_secret.expose_secret().as_bytes(),
            settings.expiry_minutes,
        )
    }

    pub fn issue(&self, identity: &IdentityClaims) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`. Identical identity and
    /// timestamp yield an identical token.
    pub fn issue_at(
        &self,
        identity: &IdentityClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            role: identity.role.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Check signature and expiry against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the caller's clock, with no leeway.
        validation.validate_exp = false;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                TokenError::InvalidToken
            })?;

        if now.timestamp() >= token_data.claims.exp {
            tracing::debug!(sub = %token_data.claims.sub, "Token expired");
            return Err(TokenError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service() -> TokenService {
        TokenService::new(b"test-signing-key", 120)
    }

    fn identity() -> IdentityClaims {
        IdentityClaims {
            user_id: "7".to_string(),
            email: "manager@example.com".to_string(),
            role: "Manager".to_string(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn issued_token_verifies_with_claims() {
        let token = service().issue_at(&identity(), t0()).unwrap();
        let claims = service()
            .verify_at(&token, t0() + Duration::minutes(30))
            .unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "manager@example.com");
        assert_eq!(claims.role, "Manager");
        assert_eq!(claims.iat, t0().timestamp());
        assert_eq!(claims.exp, (t0() + Duration::hours(2)).timestamp());
    }

    #[test]
    fn same_claims_and_timestamp_give_same_token() {
        let a = service().issue_at(&identity(), t0()).unwrap();
        let b = service().issue_at(&identity(), t0()).unwrap();
        assert_eq!(a, b);

        let c = service()
            .issue_at(&identity(), t0() + Duration::seconds(1))
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn expired_after_two_hours() {
        let token = service().issue_at(&identity(), t0()).unwrap();

        assert!(service()
            .verify_at(&token, t0() + Duration::minutes(119))
            .is_ok());
        assert!(matches!(
            service().verify_at(&token, t0() + Duration::minutes(121)),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let token = TokenService::new(b"another-key", 120)
            .issue_at(&identity(), t0())
            .unwrap();
        assert!(matches!(
            service().verify_at(&token, t0()),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            service().verify("not.a.token"),
            Err(TokenError::InvalidToken)
        ));
    }
}
