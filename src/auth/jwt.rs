//! JWT token generation and validation
//!
//! Tokens are signed HS256 and carry the account id, email, and role.
//! Handlers treat the verified claims as the authenticated identity.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::Role;
use crate::types::LecternError;

/// Claims carried in every Lectern token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (hex document id)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Account role at issue time
    pub role: Role,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Input for token generation
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

/// Result of token verification
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// HS256 token signer/verifier
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator from a shared secret
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, LecternError> {
        if secret.is_empty() {
            return Err(LecternError::Config("JWT secret must not be empty".into()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Dev-mode validator with a fixed insecure secret
    pub fn new_dev() -> Self {
        Self::new("dev-only-insecure-secret".to_string(), 86400)
            .expect("dev validator construction cannot fail")
    }

    /// Generate a signed token for the given identity
    pub fn generate_token(&self, input: TokenInput) -> Result<String, LecternError> {
        let now = unix_now();
        let claims = Claims {
            sub: input.user_id,
            email: input.email,
            role: input.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| LecternError::Auth(format!("Failed to sign token: {}", e)))
    }

    /// Verify a token and extract its claims
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(token, &self.decoding_key, &Validation::default()) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret".to_string(), 3600).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = validator();
        let token = jwt
            .generate_token(TokenInput {
                user_id: "64f000000000000000000001".to_string(),
                email: "student@example.com".to_string(),
                role: Role::Student,
            })
            .unwrap();

        let result = jwt.verify_token(&token);
        assert!(result.valid);

        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "64f000000000000000000001");
        assert_eq!(claims.email, "student@example.com");
        assert_eq!(claims.role, Role::Student);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = validator();
        let token = jwt
            .generate_token(TokenInput {
                user_id: "id".to_string(),
                email: "a@b.c".to_string(),
                role: Role::Mentor,
            })
            .unwrap();

        let other = JwtValidator::new("different-secret".to_string(), 3600).unwrap();
        let result = other.verify_token(&token);
        assert!(!result.valid);
        assert!(result.claims.is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = validator();

        // Hand-craft claims already past expiry (beyond the default leeway)
        let now = unix_now();
        let claims = Claims {
            sub: "id".to_string(),
            email: "a@b.c".to_string(),
            role: Role::Student,
            iat: now.saturating_sub(7200),
            exp: now.saturating_sub(3600),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = jwt.verify_token(&token);
        assert!(!result.valid);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = validator().verify_token("not-a-token");
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(JwtValidator::new(String::new(), 3600).is_err());
    }
}
