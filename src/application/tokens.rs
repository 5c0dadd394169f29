//! Signed bearer tokens carrying a numeric `userId` claim.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::AuthSettings;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("authentication is not configured")]
    NotConfigured,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize)]
struct IssuedClaims {
    #[serde(rename = "userId")]
    user_id: i64,
    iat: i64,
    exp: i64,
}

/// Claims are read loosely: tokens minted elsewhere may carry anything, and
/// only an integral `userId` is trusted.
#[derive(Debug, Deserialize)]
struct PresentedClaims {
    #[serde(rename = "userId", default)]
    user_id: Option<Value>,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

pub struct TokenService {
    keys: Option<SigningKeys>,
    ttl: Duration,
    validation: Validation,
}

impl TokenService {
    /// An empty secret is treated the same as no secret.
    pub fn new(secret: Option<&str>, ttl: Duration) -> Self {
        let keys = secret
            .filter(|secret| !secret.is_empty())
            .map(|secret| SigningKeys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            });

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // `exp` is honoured when present but not demanded.
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            keys,
            ttl,
            validation,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.jwt_secret.as_deref(), settings.token_ttl)
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, user_id: i64, issued_at: OffsetDateTime) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::NotConfigured)?;
        let iat = issued_at.unix_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = IssuedClaims {
            user_id,
            iat,
            exp: iat.saturating_add(ttl),
        };
        Ok(encode(&Header::default(), &claims, &keys.encoding)?)
    }

    /// Returns the user id for a valid token. Every failure yields `None`.
    pub fn verify(&self, token: &str) -> Option<i64> {
        let keys = self.keys.as_ref()?;
        let data = match decode::<PresentedClaims>(token, &keys.decoding, &self.validation) {
            Ok(data) => data,
            Err(err) => {
                debug!(target = "leasehold::auth", error = %err, "ignoring unverifiable token");
                return None;
            }
        };
        data.claims.user_id.as_ref().and_then(integral_id)
    }
}

fn integral_id(value: &Value) -> Option<i64> {
    if let Some(id) = value.as_i64() {
        return Some(id);
    }
    let float = value.as_f64()?;
    let in_range = float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64;
    in_range.then_some(float as i64)
}
