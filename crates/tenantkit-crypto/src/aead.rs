//! AES-256-GCM webhook resource decryption.
//!
//! Payment notifications carry their business payload encrypted under the
//! merchant API v3 secret. The ciphertext is base64 of `encrypted || tag`
//! with a 16-byte GCM tag; nonce and associated data travel next to it in
//! plain text.

use aes_gcm::aead::{Aead, AeadInPlace, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::CryptoError;

/// Algorithm label carried in the resource envelope.
pub const AEAD_AES_256_GCM: &str = "AEAD_AES_256_GCM";

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// The `resource` object of an encrypted notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedResource {
    pub algorithm: String,
    pub ciphertext: String,
    pub nonce: String,
    #[serde(default)]
    pub associated_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<String>,
}

impl EncryptedResource {
    /// Encrypt `plaintext` into a new envelope.
    pub fn seal(
        api_key: &[u8],
        nonce: &str,
        associated_data: &str,
        plaintext: &[u8],
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            algorithm: AEAD_AES_256_GCM.to_string(),
            ciphertext: seal_resource(api_key, nonce, associated_data, plaintext)?,
            nonce: nonce.to_string(),
            associated_data: associated_data.to_string(),
            original_type: None,
        })
    }

    /// Decrypt the envelope into its UTF-8 plaintext.
    pub fn decrypt(&self, api_key: &[u8]) -> Result<String, CryptoError> {
        if self.algorithm != AEAD_AES_256_GCM {
            return Err(CryptoError::UnsupportedAlgorithm(self.algorithm.clone()));
        }
        let plaintext = decrypt_resource(api_key, &self.nonce, &self.associated_data, &self.ciphertext)?;
        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".to_string()))
    }

    /// Decrypt and deserialize the JSON plaintext.
    pub fn decrypt_json<T: DeserializeOwned>(&self, api_key: &[u8]) -> Result<T, CryptoError> {
        Ok(serde_json::from_str(&self.decrypt(api_key)?)?)
    }
}

/// Decrypt a base64 `ciphertext || tag` blob.
///
/// # Arguments
/// * `api_key` - 32-byte merchant API secret.
/// * `nonce` - 12-character nonce from the envelope.
/// * `associated_data` - AAD from the envelope (may be empty).
/// * `ciphertext` - Base64 of the encrypted bytes followed by the tag.
///
/// # Returns
/// The plaintext, or [`CryptoError::AuthenticationFailed`] on tag mismatch.
pub fn decrypt_resource(
    api_key: &[u8],
    nonce: &str,
    associated_data: &str,
    ciphertext: &str,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher(api_key)?;
    let nonce = nonce_from(nonce)?;
    let mut buffer = BASE64.decode(ciphertext.trim())?;
    if buffer.len() < TAG_LEN {
        return Err(CryptoError::InvalidCiphertext(format!(
            "{} bytes is shorter than the {TAG_LEN}-byte tag",
            buffer.len()
        )));
    }
    let tag_bytes = buffer.split_off(buffer.len() - TAG_LEN);
    let tag = Tag::from_slice(&tag_bytes);
    cipher
        .decrypt_in_place_detached(nonce, associated_data.as_bytes(), &mut buffer, tag)
        .map_err(|_| {
            tracing::warn!("webhook resource failed AEAD authentication");
            CryptoError::AuthenticationFailed
        })?;
    Ok(buffer)
}

/// Encrypt `plaintext` into base64 `ciphertext || tag`.
pub fn seal_resource(
    api_key: &[u8],
    nonce: &str,
    associated_data: &str,
    plaintext: &[u8],
) -> Result<String, CryptoError> {
    let cipher = cipher(api_key)?;
    let nonce = nonce_from(nonce)?;
    let sealed = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: associated_data.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(BASE64.encode(sealed))
}

fn cipher(api_key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if api_key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "API secret must be {KEY_LEN} bytes, got {}",
            api_key.len()
        )));
    }
    Aes256Gcm::new_from_slice(api_key).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

fn nonce_from(nonce: &str) -> Result<&Nonce<aes_gcm::aead::consts::U12>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidCiphertext(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    Ok(Nonce::from_slice(nonce.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
    const NONCE: &str = "nonce1234567";
    const AAD: &str = "transaction";
    const PLAINTEXT: &str = r#"{"out_trade_no":"T100","trade_state":"SUCCESS"}"#;
    const CIPHERTEXT: &str =
        "ShQcIS3IoTdnC1REo7HaOjpQtPWpSrpG17M+ECCJ/w2PbT8jGfyUsVs0pulDTvTC7gLOZd/z52NUt+Hkd0iz";

    fn envelope() -> EncryptedResource {
        serde_json::from_value(serde_json::json!({
            "original_type": "transaction",
            "algorithm": "AEAD_AES_256_GCM",
            "ciphertext": CIPHERTEXT,
            "associated_data": AAD,
            "nonce": NONCE,
        }))
        .unwrap()
    }

    #[test]
    fn test_decrypt_known_vector() {
        let plaintext = decrypt_resource(KEY, NONCE, AAD, CIPHERTEXT).unwrap();
        assert_eq!(plaintext, PLAINTEXT.as_bytes());
    }

    #[test]
    fn test_seal_matches_known_vector() {
        assert_eq!(seal_resource(KEY, NONCE, AAD, PLAINTEXT.as_bytes()).unwrap(), CIPHERTEXT);
    }

    #[test]
    fn test_envelope_decrypt_json() {
        let value: Value = envelope().decrypt_json(KEY).unwrap();
        assert_eq!(value["trade_state"], "SUCCESS");
    }

    #[test]
    fn test_tampered_ciphertext_fails_closed() {
        let mut raw = BASE64.decode(CIPHERTEXT).unwrap();
        raw[0] ^= 0x01;
        let tampered = BASE64.encode(raw);
        assert!(matches!(
            decrypt_resource(KEY, NONCE, AAD, &tampered),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_wrong_aad_nonce_or_key_fails_closed() {
        assert!(matches!(
            decrypt_resource(KEY, NONCE, "refund", CIPHERTEXT),
            Err(CryptoError::AuthenticationFailed)
        ));
        assert!(matches!(
            decrypt_resource(KEY, "nonce7654321", AAD, CIPHERTEXT),
            Err(CryptoError::AuthenticationFailed)
        ));
        assert!(matches!(
            decrypt_resource(b"fedcba9876543210fedcba9876543210", NONCE, AAD, CIPHERTEXT),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            decrypt_resource(b"short", NONCE, AAD, CIPHERTEXT),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            decrypt_resource(KEY, "short", AAD, CIPHERTEXT),
            Err(CryptoError::InvalidCiphertext(_))
        ));
        assert!(matches!(
            decrypt_resource(KEY, NONCE, AAD, "AAAA"),
            Err(CryptoError::InvalidCiphertext(_))
        ));
        assert!(matches!(
            decrypt_resource(KEY, NONCE, AAD, "***"),
            Err(CryptoError::Base64(_))
        ));
    }

    #[test]
    fn test_unknown_envelope_algorithm() {
        let mut resource = envelope();
        resource.algorithm = "AEAD_SM4_GCM".to_string();
        assert!(matches!(
            resource.decrypt(KEY),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_seal_then_open_envelope() {
        let sealed = EncryptedResource::seal(KEY, "abcdefghijkl", "", b"hello").unwrap();
        assert_eq!(sealed.decrypt(KEY).unwrap(), "hello");
    }
}
