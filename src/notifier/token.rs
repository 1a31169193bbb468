use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Lifetime of an internal service token.
pub const TOKEN_TTL_SECS: i64 = 5 * 60;

/// Role claim the backend requires on transaction updates.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, thiserror::Error)]
#[error("failed to sign internal token: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

/// Claims of the service-to-service assertion sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalClaims {
    pub iss: String,
    pub aud: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mints short-lived HS256 tokens with the process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Sign a fresh token valid for [`TOKEN_TTL_SECS`].
    pub fn issue(&self) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = InternalClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn validation(issuer: &str, audience: &str) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation
    }

    #[test]
    fn issued_token_carries_internal_claims() {
        let issuer = TokenIssuer::new("test_secret", "payment-ms", "backend");
        let token = issuer.issue().unwrap();

        let data = decode::<InternalClaims>(
            &token,
            &DecodingKey::from_secret(b"test_secret"),
            &validation("payment-ms", "backend"),
        )
        .unwrap();

        assert_eq!(data.claims.role, "admin");
        assert_eq!(data.claims.iss, "payment-ms");
        assert_eq!(data.claims.aud, "backend");

        let expires_in = data.claims.exp - Utc::now().timestamp();
        assert!(expires_in > 4 * 60);
        assert!(expires_in <= 5 * 60);
    }

    #[test]
    fn token_does_not_verify_with_another_secret() {
        let issuer = TokenIssuer::new("secret1", "payment-ms", "backend");
        let token = issuer.issue().unwrap();

        let result = decode::<InternalClaims>(
            &token,
            &DecodingKey::from_secret(b"secret2"),
            &validation("payment-ms", "backend"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn token_is_rejected_for_another_audience() {
        let issuer = TokenIssuer::new("secret", "payment-ms", "backend");
        let token = issuer.issue().unwrap();

        let result = decode::<InternalClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation("payment-ms", "someone-else"),
        );
        assert!(result.is_err());
    }
}
