//! Session tokens (HS256 JWT)
//!
//! Tokens are self-contained: the server keeps no session store, so a token
//! stays valid until its `exp` passes. Verification checks, in order, the
//! token structure, the signature and the expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Lifetime of a session token issued at login
pub const SESSION_TTL_HOURS: i64 = 24;

/// Identity claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Account ID (UUID string)
    pub user_id: String,
}

/// A freshly issued session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(String),

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Payload as read back from the wire: registered claims plus the caller's.
#[derive(Deserialize)]
struct Envelope<C> {
    exp: i64,
    #[serde(default)]
    #[allow(dead_code)]
    iat: Option<i64>,
    #[serde(flatten)]
    claims: C,
}

/// Issues and verifies session tokens with one symmetric signing key.
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens").finish_non_exhaustive()
    }
}

impl SessionTokens {
    /// Create token keys from an HMAC-SHA256 secret
    ///
    /// Validates signature and expiration only; there is no issuer,
    /// audience or not-before check.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        // Expiry is exact: `verify` rejects from the `exp` second onwards.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims` with an expiry of `now + ttl`.
    ///
    /// `claims` must serialize to a flat JSON object. `iat` and `exp` are
    /// added to it and overwrite any claims with the same names.
    pub fn issue<C: Serialize>(&self, claims: &C, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(claims, now.timestamp(), (now + ttl).timestamp())
    }

    /// Issue the 24-hour login token for an account
    pub fn issue_session(&self, user_id: &str) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(SESSION_TTL_HOURS);
        let claims = SessionClaims {
            user_id: user_id.to_string(),
        };

        let token = self.sign(&claims, now.timestamp(), expires_at.timestamp())?;

        Ok(IssuedToken {
            token,
            expires_at: DateTime::<Utc>::from_timestamp(expires_at.timestamp(), 0)
                .unwrap_or(expires_at),
        })
    }

    fn sign<C: Serialize>(&self, claims: &C, iat: i64, exp: i64) -> Result<String, TokenError> {
        let mut payload = match serde_json::to_value(claims) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(TokenError::Encoding(format!(
                    "claims must serialize to a JSON object, got {}",
                    other
                )))
            }
            Err(e) => return Err(TokenError::Encoding(e.to_string())),
        };

        payload.insert("iat".to_string(), Value::from(iat));
        payload.insert("exp".to_string(), Value::from(exp));

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify a token and return the claims it was issued with.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        let token_data = decode::<Envelope<C>>(token, &self.decoding_key, &self.validation)?;

        if Utc::now().timestamp() >= token_data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(token_data.claims.claims)
    }
}
