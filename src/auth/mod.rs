//! Token gate for the push channel
//!
//! - `token`: HS256 bearer token validation and issuance
//! - `attempts`: per-address failed attempt ledger used for lockouts
//! - `crypto`: AES-256-GCM encryption of tokens at rest
//! - `error`: rejection reasons and hard errors

pub mod attempts;
pub mod crypto;
pub mod error;
pub mod token;

pub use attempts::{FailedAttemptLedger, FailedAttemptRecord};
pub use crypto::{decrypt_token, encrypt_token};
pub use error::{CryptoError, TokenError, TokenRejection};
pub use token::{Claims, TokenManager, TokenValidation};

use std::sync::Arc;

/// Thread-safe wrapper for TokenManager
pub type SharedTokenManager = Arc<TokenManager>;
