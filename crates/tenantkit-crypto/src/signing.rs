//! Parameter-sorting signatures.
//!
//! One engine covers the four algorithms the supported platforms use over
//! the canonical `key=value&...` string:
//!
//! | algorithm     | key            | signed bytes                     | output        |
//! |---------------|----------------|----------------------------------|---------------|
//! | `RSA`         | RSA private    | canonical                        | base64        |
//! | `RSA2`        | RSA private    | canonical                        | base64        |
//! | `HMAC-SHA256` | shared secret  | `canonical&key=<secret>`         | upper hex     |
//! | `MD5`         | shared secret  | `canonical&key=<secret>`         | upper hex     |
//!
//! Verification never errors: a malformed, tampered or mismatched signature
//! is reported as [`Verification::Invalid`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde_json::Value;
use sha1::Sha1;
use sha2::Sha256;

use tenantkit_primitives::canonicalize;
use tenantkit_primitives::hash::{constant_time_eq, md5, sha256_hmac, upper_hex};

use crate::context::{Algorithm, SigningContext};
use crate::keys::{PrivateKey, PublicKey};
use crate::CryptoError;

/// Key material for producing signatures.
#[derive(Debug, Clone)]
pub enum SigningKey {
    /// RSA private key for `RSA` / `RSA2`.
    Rsa(PrivateKey),
    /// Shared secret for `HMAC-SHA256` / `MD5`.
    Secret(String),
}

/// Key material for checking signatures.
#[derive(Debug, Clone)]
pub enum VerifyingKey {
    /// RSA public key for `RSA` / `RSA2`.
    Rsa(PublicKey),
    /// Shared secret for `HMAC-SHA256` / `MD5`.
    Secret(String),
}

/// Outcome of a signature check.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid,
}

impl Verification {
    pub fn from_bool(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }

    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    /// Turn an invalid outcome into [`CryptoError::SignatureInvalid`].
    pub fn into_result(self) -> Result<(), CryptoError> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid => Err(CryptoError::SignatureInvalid),
        }
    }
}

/// Sign a parameter map under `ctx`.
///
/// # Arguments
/// * `ctx` - Algorithm and omit-set.
/// * `key` - Must match the algorithm family.
/// * `params` - Any `(key, value)` iterator, e.g. `&serde_json::Map`.
///
/// # Returns
/// Base64 for RSA, upper-case hex for HMAC and MD5.
pub fn sign<'a, I, K>(ctx: &SigningContext, key: &SigningKey, params: I) -> Result<String, CryptoError>
where
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    let canonical = canonicalize(params, ctx.omit());
    if canonical.is_empty() {
        return Err(CryptoError::EmptyCanonical);
    }
    sign_canonical(ctx, key, &canonical)
}

/// Sign an already-canonical string.
pub fn sign_canonical(
    ctx: &SigningContext,
    key: &SigningKey,
    canonical: &str,
) -> Result<String, CryptoError> {
    let algorithm = ctx.algorithm();
    match (algorithm, key) {
        (Algorithm::RsaSha1, SigningKey::Rsa(private)) => {
            let signer = pkcs1v15::SigningKey::<Sha1>::new(private.as_rsa().clone());
            let signature = signer
                .try_sign(canonical.as_bytes())
                .map_err(|e| CryptoError::Signing(e.to_string()))?;
            Ok(BASE64.encode(signature.to_bytes()))
        }
        (Algorithm::RsaSha256, SigningKey::Rsa(private)) => {
            rsa_sign_sha256(private, canonical.as_bytes())
        }
        (Algorithm::HmacSha256 | Algorithm::Md5, SigningKey::Secret(secret)) => {
            Ok(secret_digest(ctx, secret, canonical))
        }
        (alg, _) => Err(key_mismatch(alg)),
    }
}

/// Verify `signature` over a parameter map under `ctx`.
pub fn verify<'a, I, K>(
    ctx: &SigningContext,
    key: &VerifyingKey,
    params: I,
    signature: &str,
) -> Verification
where
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    let canonical = canonicalize(params, ctx.omit());
    if canonical.is_empty() {
        tracing::warn!("nothing signable in verified parameters");
        return Verification::Invalid;
    }
    verify_canonical(ctx, key, &canonical, signature)
}

/// Verify `signature` over an already-canonical string.
pub fn verify_canonical(
    ctx: &SigningContext,
    key: &VerifyingKey,
    canonical: &str,
    signature: &str,
) -> Verification {
    let algorithm = ctx.algorithm();
    let outcome = match (algorithm, key) {
        (Algorithm::RsaSha1, VerifyingKey::Rsa(public)) => {
            let verifier = pkcs1v15::VerifyingKey::<Sha1>::new(public.as_rsa().clone());
            match decode_rsa_signature(signature) {
                Some(sig) => Verification::from_bool(verifier.verify(canonical.as_bytes(), &sig).is_ok()),
                None => Verification::Invalid,
            }
        }
        (Algorithm::RsaSha256, VerifyingKey::Rsa(public)) => {
            rsa_verify_sha256(public, canonical.as_bytes(), signature)
        }
        (Algorithm::HmacSha256 | Algorithm::Md5, VerifyingKey::Secret(secret)) => {
            let expected = secret_digest(ctx, secret, canonical);
            let received = signature.trim().to_ascii_uppercase();
            Verification::from_bool(constant_time_eq(expected.as_bytes(), received.as_bytes()))
        }
        (alg, _) => {
            tracing::warn!(error = %key_mismatch(alg), "verification key does not match algorithm");
            Verification::Invalid
        }
    };
    if !outcome.is_valid() {
        tracing::debug!(algorithm = %algorithm, "signature did not verify");
    }
    outcome
}

/// RSA PKCS#1 v1.5 SHA-256 signature over raw bytes, base64 encoded.
///
/// Shared by `RSA2` parameter signing and the header authorization scheme.
pub fn rsa_sign_sha256(key: &PrivateKey, message: &[u8]) -> Result<String, CryptoError> {
    let signer = pkcs1v15::SigningKey::<Sha256>::new(key.as_rsa().clone());
    let signature = signer
        .try_sign(message)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(BASE64.encode(signature.to_bytes()))
}

/// Check a base64 RSA PKCS#1 v1.5 SHA-256 signature over raw bytes.
pub fn rsa_verify_sha256(key: &PublicKey, message: &[u8], signature: &str) -> Verification {
    let verifier = pkcs1v15::VerifyingKey::<Sha256>::new(key.as_rsa().clone());
    match decode_rsa_signature(signature) {
        Some(sig) => Verification::from_bool(verifier.verify(message, &sig).is_ok()),
        None => Verification::Invalid,
    }
}

fn decode_rsa_signature(signature: &str) -> Option<pkcs1v15::Signature> {
    let bytes = BASE64.decode(signature.trim()).ok()?;
    pkcs1v15::Signature::try_from(bytes.as_slice()).ok()
}

fn secret_digest(ctx: &SigningContext, secret: &str, canonical: &str) -> String {
    let message = format!("{canonical}&{}={secret}", ctx.secret_suffix().label());
    match ctx.algorithm() {
        Algorithm::HmacSha256 => upper_hex(&sha256_hmac(secret.as_bytes(), message.as_bytes())),
        _ => upper_hex(&md5(message.as_bytes())),
    }
}

fn key_mismatch(algorithm: Algorithm) -> CryptoError {
    CryptoError::KeyMismatch {
        algorithm: algorithm.as_str(),
        expected: if algorithm.is_asymmetric() {
            "an RSA"
        } else {
            "shared-secret"
        },
    }
}
