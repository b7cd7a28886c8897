//! Session token issuance and parsing
//!
//! Tokens are HS256 JWTs with a fixed 24 hour lifetime. There is no refresh
//! flow and no revocation list: an expired token forces a new login, and a
//! deactivated account is caught at user lookup, not here.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::auth::Role;
use crate::types::{QuillError, RespCode};

/// Token validity window in seconds
pub const TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// Minimum accepted length for the shared signing secret
pub const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Payload stored in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user identifier
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Not before (Unix timestamp)
    pub nbf: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Why a token was not accepted
///
/// Callers must not leak the variant to clients; every parse failure
/// converts to the single `TokenInvalid` code.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Token malformed")]
    Malformed,

    #[error("Invalid signature")]
    SignatureInvalid,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for QuillError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => QuillError::Auth(msg),
            TokenError::Expired
            | TokenError::NotYetValid
            | TokenError::Malformed
            | TokenError::SignatureInvalid => QuillError::Unauthenticated(RespCode::TokenInvalid),
        }
    }
}

/// Issues and parses session tokens with a shared secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a token service
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: &str) -> Result<Self, QuillError> {
        if secret.is_empty() {
            return Err(QuillError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(QuillError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self::from_secret(secret.as_bytes()))
    }

    /// Create a service for dev mode with a fixed, public secret
    pub fn new_dev() -> Self {
        Self::from_secret(DEV_SECRET.as_bytes())
    }

    fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for an authenticated user
    pub fn issue(&self, user_id: &str, username: &str, role: Role) -> Result<IssuedToken, TokenError> {
        let now = now_secs()?;

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            iat: now,
            nbf: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify and decode a token
    ///
    /// Accepts iff the signature is valid and `nbf <= now < exp`.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
            let kind = match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                _ => TokenError::Malformed,
            };
            debug!("Token rejected: {}", kind);
            kind
        })?;

        // The library accepts exp == now; the window is half-open.
        if data.claims.exp <= now_secs()? {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

fn now_secs() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TokenError::Signing(format!("System time error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new("test-secret-that-is-at-least-32-characters-long").unwrap()
    }

    fn claims_at(iat: u64, nbf: u64, exp: u64) -> Claims {
        Claims {
            sub: "user-1".into(),
            username: "alice".into(),
            role: Role::Member,
            iat,
            nbf,
            exp,
        }
    }

    #[test]
    fn test_issue_and_parse() {
        let service = test_service();
        let issued = service.issue("user-1", "alice", Role::Member).unwrap();

        let claims = service.parse(&issued.token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Member);
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp, claims.iat + TOKEN_LIFETIME_SECS);
        assert_eq!(issued.expires_at, claims.exp);
    }

    #[test]
    fn test_token_has_three_segments() {
        let issued = test_service().issue("user-1", "alice", Role::Admin).unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
    }

    #[test]
    fn test_any_signature_mutation_fails() {
        let service = test_service();
        let token = service.issue("user-1", "alice", Role::Member).unwrap().token;
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(service.parse(&mutated).is_err(), "mutation at {} accepted", i);
        }
    }

    #[test]
    fn test_expired_token() {
        let service = test_service();
        let now = now_secs().unwrap();
        let token = service.sign(&claims_at(now - 200, now - 200, now - 100)).unwrap();

        assert_eq!(service.parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_expiring_now_is_expired() {
        let service = test_service();
        let now = now_secs().unwrap();
        let token = service.sign(&claims_at(now - 100, now - 100, now)).unwrap();

        assert_eq!(service.parse(&token), Err(TokenError::Expired));

        let token = service.sign(&claims_at(now - 100, now - 100, now + 60)).unwrap();
        assert!(service.parse(&token).is_ok());
    }

    #[test]
    fn test_not_yet_valid_token() {
        let service = test_service();
        let now = now_secs().unwrap();
        let token = service.sign(&claims_at(now, now + 3600, now + 7200)).unwrap();

        assert_eq!(service.parse(&token), Err(TokenError::NotYetValid));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let service = test_service();
        assert_eq!(service.parse("garbage"), Err(TokenError::Malformed));
        assert_eq!(service.parse(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_secret() {
        let other = TokenService::new("different-secret-that-is-at-least-32-characters").unwrap();
        let token = test_service().issue("user-1", "alice", Role::Member).unwrap().token;

        assert_eq!(other.parse(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_parse_errors_surface_uniformly() {
        for err in [
            TokenError::Expired,
            TokenError::NotYetValid,
            TokenError::Malformed,
            TokenError::SignatureInvalid,
        ] {
            let err: QuillError = err.into();
            assert_eq!(err.resp_code(), RespCode::TokenInvalid);
        }
    }

    #[test]
    fn test_secret_validation() {
        assert!(TokenService::new("short").is_err());
        assert!(TokenService::new("").is_err());
        assert!(TokenService::new("this-secret-is-at-least-32-chars-long").is_ok());
    }

    #[test]
    fn test_dev_mode_service() {
        let service = TokenService::new_dev();
        let token = service.issue("user-1", "alice", Role::Admin).unwrap().token;
        assert!(service.parse(&token).is_ok());
    }
}
