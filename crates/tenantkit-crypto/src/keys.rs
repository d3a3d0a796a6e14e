//! RSA key material.
//!
//! Platforms hand out keys in three shapes: PKCS#8 PEM, PKCS#1 PEM and a
//! bare base64 DER blob (the "key string" pasted from a developer console).
//! [`PrivateKey::parse`] and [`PublicKey::parse`] accept all of them.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::CryptoError;

/// An RSA private key used for request signing and field decryption.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Parse a PEM (`PRIVATE KEY` or `RSA PRIVATE KEY`) or bare base64 DER key.
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        let input = input.trim();
        if input.starts_with("-----BEGIN") {
            Self::from_pem(input)
        } else {
            Self::from_base64_der(input)
        }
    }

    /// Parse a PEM-encoded key, PKCS#8 or PKCS#1.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let inner = if pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::InvalidKey(e.to_string()))?
        } else {
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::InvalidKey(e.to_string()))?
        };
        Ok(Self { inner })
    }

    /// Parse a base64 DER key, trying PKCS#8 first and PKCS#1 second.
    pub fn from_base64_der(b64: &str) -> Result<Self, CryptoError> {
        let der = decode_compact_base64(b64)?;
        let inner = RsaPrivateKey::from_pkcs8_der(&der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.inner.to_public_key(),
        }
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.inner.size() * 8
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(inner: RsaPrivateKey) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// An RSA public key used for response verification and field encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Parse a PEM (`PUBLIC KEY` or `RSA PUBLIC KEY`), a certificate PEM, or
    /// a bare base64 SPKI DER key.
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        let input = input.trim();
        if input.contains("BEGIN CERTIFICATE") {
            crate::certificate::public_key_from_certificate(input.as_bytes())
        } else if input.starts_with("-----BEGIN") {
            Self::from_pem(input)
        } else {
            Self::from_base64_der(input)
        }
    }

    /// Parse a PEM-encoded public key, SPKI or PKCS#1.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let inner = if pem.contains("BEGIN RSA PUBLIC KEY") {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::InvalidKey(e.to_string()))?
        } else {
            RsaPublicKey::from_public_key_pem(pem)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?
        };
        Ok(Self { inner })
    }

    /// Parse a base64 DER key, trying SPKI first and PKCS#1 second.
    pub fn from_base64_der(b64: &str) -> Result<Self, CryptoError> {
        let der = decode_compact_base64(b64)?;
        Self::from_spki_der(&der).or_else(|_| {
            RsaPublicKey::from_pkcs1_der(&der)
                .map(|inner| Self { inner })
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))
        })
    }

    /// Parse a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, CryptoError> {
        let inner = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.inner.size() * 8
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

impl From<RsaPublicKey> for PublicKey {
    fn from(inner: RsaPublicKey) -> Self {
        Self { inner }
    }
}

/// Decode base64 that may have been pasted with line breaks or spaces.
fn decode_compact_base64(input: &str) -> Result<Vec<u8>, CryptoError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(BASE64.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKCS8_PEM: &str = include_str!("../tests/fixtures/app_private_key.pem");
    const PKCS1_PEM: &str = include_str!("../tests/fixtures/app_private_key_pkcs1.pem");
    const PUBLIC_PEM: &str = include_str!("../tests/fixtures/app_public_key.pem");
    const CERT_PEM: &str = include_str!("../tests/fixtures/app_cert.pem");

    fn pem_body(pem: &str) -> String {
        pem.lines().filter(|l| !l.starts_with("-----")).collect()
    }

    #[test]
    fn test_private_key_formats_agree() {
        let pkcs8 = PrivateKey::parse(PKCS8_PEM).unwrap();
        let pkcs1 = PrivateKey::parse(PKCS1_PEM).unwrap();
        let bare = PrivateKey::parse(&pem_body(PKCS8_PEM)).unwrap();
        assert_eq!(pkcs8.public_key(), pkcs1.public_key());
        assert_eq!(pkcs8.public_key(), bare.public_key());
        assert_eq!(pkcs8.bits(), 2048);
    }

    #[test]
    fn test_public_key_formats_agree() {
        let private = PrivateKey::parse(PKCS8_PEM).unwrap();
        let pem = PublicKey::parse(PUBLIC_PEM).unwrap();
        let bare = PublicKey::parse(&pem_body(PUBLIC_PEM)).unwrap();
        let from_cert = PublicKey::parse(CERT_PEM).unwrap();
        assert_eq!(pem, private.public_key());
        assert_eq!(bare, pem);
        assert_eq!(from_cert, pem);
    }

    #[test]
    fn test_garbage_is_invalid_key() {
        assert!(matches!(
            PrivateKey::parse("bm90IGEga2V5"),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            PublicKey::parse("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----"),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(PublicKey::parse("%%%"), Err(CryptoError::Base64(_))));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = PrivateKey::parse(PKCS8_PEM).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("2048"));
        assert!(!printed.contains("primes"));
    }
}
