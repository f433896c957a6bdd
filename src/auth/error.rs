//! Authentication and token crypto errors

use serde::Serialize;
use thiserror::Error;

/// Reason a bearer token was refused
///
/// The display strings are stable and sent to clients verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    #[error("Invalid token format")]
    InvalidFormat,
    #[error("Token length below minimum requirement")]
    TooShort,
    #[error("Too many failed attempts. Please try again later.")]
    TooManyAttempts,
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Invalid token")]
    Invalid,
    #[error("Invalid token payload")]
    InvalidPayload,
    #[error("Token missing required claims")]
    MissingClaims,
    #[error("Token exceeds maximum age")]
    TooOld,
}

impl TokenRejection {
    /// Whether this rejection counts towards the address lockout
    pub fn counts_as_failure(self) -> bool {
        !matches!(self, TokenRejection::TooManyAttempts)
    }
}

/// Token issuance errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("token payload must be a JSON object")]
    InvalidPayload,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Symmetric encryption errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("encryption key must be at least {required} bytes (got {actual})")]
    KeyTooShort { required: usize, actual: usize },
    #[error("cannot encrypt an empty token")]
    EmptyPlaintext,
    #[error("Invalid encrypted token format")]
    InvalidFormat,
    #[error("Invalid encrypted token")]
    InvalidEncryptedToken,
    #[error("encryption failed")]
    Encryption,
}
