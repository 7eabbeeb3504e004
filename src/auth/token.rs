use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::principal::{Principal, Role};
use crate::config::SecurityConfig;

/// Minimum decoded key length for HS256 (256 bits)
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret is not valid base64: {0}")]
    InvalidSecret(String),

    #[error("signing secret decodes to {bits} bits, at least 256 are required")]
    WeakSecret { bits: usize },

    #[error("token TTL must be greater than zero")]
    InvalidTtl,

    #[error("token generation failed: {0}")]
    Signing(String),

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(rename = "organizationId")]
    pub organization_id: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.exp.saturating_mul(1000)
    }

    /// Tokens are only issued to active accounts, so the principal starts active.
    pub fn principal(&self) -> Principal {
        Principal {
            subject_id: self.sub,
            tenant_id: self.organization_id,
            role: self.role,
            active: true,
        }
    }
}

/// Issues and verifies HS256 session tokens under a single configured key.
///
/// Tokens are self-contained: nothing is stored server side, and expiry is
/// the only way a token stops being accepted.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenCodec {
    /// Build a codec from a base64 secret. Fails if the key is shorter than 256 bits.
    pub fn new(secret_b64: &str, ttl_ms: u64) -> Result<Self, TokenError> {
        let secret = STANDARD
            .decode(secret_b64.trim())
            .map_err(|e| TokenError::InvalidSecret(e.to_string()))?;

        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret { bits: secret.len() * 8 });
        }
        if ttl_ms == 0 {
            return Err(TokenError::InvalidTtl);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            validation,
            // iat/exp are whole seconds; round up so exp is always after iat
            ttl_secs: ttl_ms.div_ceil(1000) as i64,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, TokenError> {
        Self::new(&security.jwt_secret, security.jwt_ttl_ms)
    }

    /// Token lifetime in milliseconds, as reported to clients. `exp` is
    /// counted from the start of the issuing second, so a token can stop
    /// being accepted up to 999 ms sooner than this; never later.
    pub fn ttl_ms(&self) -> i64 {
        self.ttl_secs.saturating_mul(1000)
    }

    pub fn issue(&self, subject_id: Uuid, tenant_id: Uuid, role: Role) -> Result<String, TokenError> {
        self.issue_at(subject_id, tenant_id, role, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject_id: Uuid,
        tenant_id: Uuid,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            sub: subject_id,
            organization_id: tenant_id,
            role,
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check structure, signature and expiry; returns the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        let claims = token_data.claims;
        if claims.exp <= claims.iat {
            return Err(TokenError::Invalid("exp must be after iat".to_string()));
        }
        // The decoder works in whole seconds; re-check at millisecond precision
        if claims.is_expired_at(Utc::now()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
