//! AES-256-GCM token encryption
//!
//! # Wire Format
//!
//! ```text
//! aes-256-gcm:<iv base64>:<tag base64>:<ciphertext base64>
//! ```
//!
//! Only the first 32 bytes of the key are used. Every call to
//! [`encrypt_token`] draws a fresh IV, so identical inputs never produce the
//! same output.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

use super::error::CryptoError;

/// Algorithm label carried in the first wire field
pub const ALGORITHM: &str = "aes-256-gcm";

/// Minimum key length in bytes
pub const MIN_KEY_LENGTH: usize = 32;

/// IV size for AES-GCM (96 bits = 12 bytes).
const IV_LENGTH: usize = 12;

/// Authentication tag size appended by AES-GCM.
const TAG_LENGTH: usize = 16;

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() < MIN_KEY_LENGTH {
        return Err(CryptoError::KeyTooShort {
            required: MIN_KEY_LENGTH,
            actual: key.len(),
        });
    }
    Aes256Gcm::new_from_slice(&key[..MIN_KEY_LENGTH]).map_err(|_| CryptoError::KeyTooShort {
        required: MIN_KEY_LENGTH,
        actual: key.len(),
    })
}

/// Encrypt a token into the four-field wire format
pub fn encrypt_token(plaintext: &str, key: &[u8]) -> Result<String, CryptoError> {
    let cipher = cipher_for(key)?;
    if plaintext.is_empty() {
        return Err(CryptoError::EmptyPlaintext);
    }

    let mut iv = [0u8; IV_LENGTH];
    rand::rng().fill_bytes(&mut iv);

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CryptoError::Encryption)?;

    // aes-gcm appends the tag to the ciphertext
    let tag = sealed.split_off(sealed.len() - TAG_LENGTH);

    Ok(format!(
        "{}:{}:{}:{}",
        ALGORITHM,
        BASE64.encode(iv),
        BASE64.encode(tag),
        BASE64.encode(sealed)
    ))
}

/// Decrypt a wire-format token produced by [`encrypt_token`]
pub fn decrypt_token(wire: &str, key: &[u8]) -> Result<String, CryptoError> {
    let cipher = cipher_for(key)?;

    let parts: Vec<&str> = wire.split(':').collect();
    let [algorithm, iv, tag, ciphertext] = parts.as_slice() else {
        return Err(CryptoError::InvalidFormat);
    };

    if *algorithm != ALGORITHM {
        return Err(CryptoError::InvalidEncryptedToken);
    }

    let decode = |field: &str| {
        BASE64
            .decode(field)
            .map_err(|_| CryptoError::InvalidEncryptedToken)
    };
    let iv = decode(*iv)?;
    let tag = decode(*tag)?;
    let mut sealed = decode(*ciphertext)?;

    if iv.len() != IV_LENGTH || tag.len() != TAG_LENGTH {
        return Err(CryptoError::InvalidEncryptedToken);
    }
    sealed.extend_from_slice(&tag);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| CryptoError::InvalidEncryptedToken)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidEncryptedToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef-extra";

    #[test]
    fn test_round_trip() {
        let token = "eyJhbGciOiJIUzI1NiJ9.payload.signature";
        let wire = encrypt_token(token, KEY).unwrap();
        assert_eq!(decrypt_token(&wire, KEY).unwrap(), token);
    }

    #[test]
    fn test_wire_has_four_fields() {
        let wire = encrypt_token("secret", KEY).unwrap();
        let parts: Vec<&str> = wire.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], ALGORITHM);
        assert_eq!(BASE64.decode(parts[1]).unwrap().len(), IV_LENGTH);
        assert_eq!(BASE64.decode(parts[2]).unwrap().len(), TAG_LENGTH);
    }

    #[test]
    fn test_ciphertext_is_not_deterministic() {
        let a = encrypt_token("same input", KEY).unwrap();
        let b = encrypt_token("same input", KEY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_key_rejected_on_both_paths() {
        let short = b"too-short";
        assert!(matches!(
            encrypt_token("x", short),
            Err(CryptoError::KeyTooShort { required: 32, actual: 9 })
        ));
        let wire = encrypt_token("x", KEY).unwrap();
        assert!(matches!(
            decrypt_token(&wire, short),
            Err(CryptoError::KeyTooShort { .. })
        ));
    }

    #[test]
    fn test_empty_plaintext_rejected() {
        assert_eq!(encrypt_token("", KEY), Err(CryptoError::EmptyPlaintext));
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(
            decrypt_token("aes-256-gcm:abc:def", KEY),
            Err(CryptoError::InvalidFormat)
        );
        assert_eq!(
            decrypt_token("a:b:c:d:e", KEY),
            Err(CryptoError::InvalidFormat)
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails_closed() {
        let wire = encrypt_token("top secret", KEY).unwrap();
        let parts: Vec<&str> = wire.split(':').collect();
        let mut body = BASE64.decode(parts[3]).unwrap();
        body[0] ^= 0xff;
        let tampered = format!("{}:{}:{}:{}", parts[0], parts[1], parts[2], BASE64.encode(body));
        assert_eq!(
            decrypt_token(&tampered, KEY),
            Err(CryptoError::InvalidEncryptedToken)
        );
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let wire = encrypt_token("top secret", KEY).unwrap();
        let other = b"ffffffffffffffffffffffffffffffff";
        assert_eq!(
            decrypt_token(&wire, other),
            Err(CryptoError::InvalidEncryptedToken)
        );
    }

    #[test]
    fn test_unknown_algorithm_and_bad_base64() {
        let wire = encrypt_token("x", KEY).unwrap();
        let swapped = wire.replacen(ALGORITHM, "aes-128-cbc", 1);
        assert_eq!(
            decrypt_token(&swapped, KEY),
            Err(CryptoError::InvalidEncryptedToken)
        );
        assert_eq!(
            decrypt_token("aes-256-gcm:!!:??:**", KEY),
            Err(CryptoError::InvalidEncryptedToken)
        );
    }
}
