//! Bearer token validation and issuance
//!
//! Tokens are HS256 JWTs carrying mandatory numeric `iat` and `exp` claims.
//! Validation runs a fixed sequence of checks and every failure except the
//! lockout itself is charged to the caller's source address.
//!
//! ## Usage
//! ```
//! use hass_bridge::auth::TokenManager;
//! use hass_bridge::config::TokenConfig;
//! use serde_json::json;
//!
//! let manager = TokenManager::new(TokenConfig::with_secret("a-secret-that-is-at-least-32-chars!!"));
//! let token = manager.generate_token(json!({"sub": "dashboard"})).unwrap();
//! assert!(manager.validate_token(&token, "127.0.0.1").is_ok());
//! ```

use std::collections::HashSet;

use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::attempts::FailedAttemptLedger;
use super::error::{TokenError, TokenRejection};
use crate::config::TokenConfig;
use crate::utils::current_timestamp_ms;

/// The only accepted signing algorithm
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Verified token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Every other claim, untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{valid, error}` view of a validation outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<Claims, TokenRejection>> for TokenValidation {
    fn from(result: &Result<Claims, TokenRejection>) -> Self {
        match result {
            Ok(_) => Self {
                valid: true,
                error: None,
            },
            Err(rejection) => Self {
                valid: false,
                error: Some(rejection.to_string()),
            },
        }
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Validates and issues bearer tokens, throttling abusive addresses
pub struct TokenManager {
    keys: Option<SigningKeys>,
    validation: Validation,
    attempts: FailedAttemptLedger,
    config: TokenConfig,
}

impl TokenManager {
    /// Create a manager from token settings
    pub fn new(config: TokenConfig) -> Self {
        let keys = config.jwt_secret.as_deref().map(|secret| SigningKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        // exp/iat presence is checked after decoding so it gets its own message
        validation.required_spec_claims = HashSet::new();

        Self {
            keys,
            validation,
            attempts: FailedAttemptLedger::new(config.max_failed_attempts, config.lockout_duration),
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Validate `token` presented from `source_address`
    pub fn validate_token(
        &self,
        token: &str,
        source_address: &str,
    ) -> Result<Claims, TokenRejection> {
        let now_ms = current_timestamp_ms();
        let result = self.check(token, source_address, now_ms);

        match &result {
            Ok(_) => self.attempts.clear(source_address),
            Err(rejection) if rejection.counts_as_failure() => {
                let count = self.attempts.record_failure(source_address, now_ms);
                debug!(address = source_address, count, reason = %rejection, "token rejected");
            }
            Err(_) => {}
        }

        result
    }

    /// Validate and return the `{valid, error}` view
    pub fn validate(&self, token: &str, source_address: &str) -> TokenValidation {
        TokenValidation::from(&self.validate_token(token, source_address))
    }

    fn check(&self, token: &str, source_address: &str, now_ms: i64) -> Result<Claims, TokenRejection> {
        if token.trim().is_empty() {
            return Err(TokenRejection::InvalidFormat);
        }

        if token.len() < self.config.min_token_length {
            return Err(TokenRejection::TooShort);
        }

        if self.attempts.is_locked_out(source_address, now_ms) {
            warn!(address = source_address, "address locked out after repeated token failures");
            return Err(TokenRejection::TooManyAttempts);
        }

        let keys = self.keys.as_ref().ok_or(TokenRejection::MissingSecret)?;

        let data = decode::<Value>(token, &keys.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                ErrorKind::InvalidSignature => TokenRejection::InvalidSignature,
                // claims are only parsed once the header parsed and the signature verified
                ErrorKind::Json(_) | ErrorKind::Base64(_) | ErrorKind::Utf8(_)
                    if decode_header(token).is_ok() =>
                {
                    TokenRejection::InvalidPayload
                }
                _ => TokenRejection::Invalid,
            }
        })?;

        let Value::Object(mut payload) = data.claims else {
            return Err(TokenRejection::InvalidPayload);
        };

        let (Some(exp), Some(iat)) = (
            payload.get("exp").and_then(numeric_claim),
            payload.get("iat").and_then(numeric_claim),
        ) else {
            return Err(TokenRejection::MissingClaims);
        };

        let now = now_ms / 1000;
        if exp <= now {
            return Err(TokenRejection::Expired);
        }

        if now.saturating_sub(iat) > self.config.max_token_age.as_secs() as i64 {
            return Err(TokenRejection::TooOld);
        }

        payload.remove("exp");
        payload.remove("iat");
        Ok(Claims {
            iat,
            exp,
            extra: payload,
        })
    }

    /// Stamp `iat`/`exp` onto `payload` and sign it
    pub fn generate_token(&self, payload: Value) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingSecret)?;
        let Value::Object(mut claims) = payload else {
            return Err(TokenError::InvalidPayload);
        };

        let now = current_timestamp_ms() / 1000;
        claims.insert("iat".to_string(), Value::from(now));
        claims.insert(
            "exp".to_string(),
            Value::from(now + self.config.token_lifetime.as_secs() as i64),
        );

        Ok(encode(&Header::new(ALGORITHM), &claims, &keys.encoding)?)
    }

    /// Failed attempts currently charged to `address`
    pub fn failed_attempts(&self, address: &str) -> u32 {
        self.attempts.attempts(address)
    }

    /// Drop failed attempt records whose lockout window has passed
    pub fn prune_failed_attempts(&self) -> usize {
        self.attempts.prune(current_timestamp_ms())
    }
}

fn numeric_claim(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}
