//! RSA-OAEP encryption of sensitive request and response fields.
//!
//! The payment gateway requires OAEP with SHA-1 for both the label hash and
//! MGF1. Padding is pinned here and never negotiated.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::Oaep;
use sha1::Sha1;

use crate::keys::{PrivateKey, PublicKey};
use crate::CryptoError;

fn padding() -> Oaep {
    Oaep::new::<Sha1>()
}

/// Encrypt a field (name, phone number, ID number) for the platform.
///
/// Returns base64 ciphertext. OAEP is randomized, so two calls never
/// produce the same output.
pub fn encrypt_field(key: &PublicKey, plaintext: &str) -> Result<String, CryptoError> {
    let mut rng = rand::thread_rng();
    let encrypted = key
        .as_rsa()
        .encrypt(&mut rng, padding(), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(BASE64.encode(encrypted))
}

/// Decrypt a base64 field the platform encrypted with our public key.
pub fn decrypt_field(key: &PrivateKey, ciphertext: &str) -> Result<String, CryptoError> {
    let raw = BASE64.decode(ciphertext.trim())?;
    let decrypted = key
        .as_rsa()
        .decrypt(padding(), &raw)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    String::from_utf8(decrypted)
        .map_err(|_| CryptoError::Decryption("field is not valid UTF-8".to_string()))
}
