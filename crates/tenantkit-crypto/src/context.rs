//! Signing context: algorithm, charset and omitted fields.

use std::fmt;
use std::str::FromStr;

use tenantkit_primitives::OmitSet;

use crate::CryptoError;

/// Name of the signature field in every parameter-sorting convention.
pub const SIGN_FIELD: &str = "sign";

/// Name of the algorithm-type field open APIs send next to the signature.
pub const SIGN_TYPE_FIELD: &str = "sign_type";

/// Signature algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSA PKCS#1 v1.5 over SHA-1 (`RSA`).
    RsaSha1,
    /// RSA PKCS#1 v1.5 over SHA-256 (`RSA2`).
    RsaSha256,
    /// HMAC-SHA256 keyed by a shared secret, upper-case hex.
    HmacSha256,
    /// MD5 over the secret-suffixed canonical string, upper-case hex.
    Md5,
}

impl Algorithm {
    /// Wire name as it appears in `sign_type` fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsaSha1 => "RSA",
            Self::RsaSha256 => "RSA2",
            Self::HmacSha256 => "HMAC-SHA256",
            Self::Md5 => "MD5",
        }
    }

    /// Whether the algorithm uses an RSA key pair rather than a shared secret.
    pub fn is_asymmetric(&self) -> bool {
        matches!(self, Self::RsaSha1 | Self::RsaSha256)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RSA" | "RSA-SHA1" | "SHA1WITHRSA" => Ok(Self::RsaSha1),
            "RSA2" | "RSA-SHA256" | "SHA256WITHRSA" => Ok(Self::RsaSha256),
            "HMAC-SHA256" | "HMACSHA256" => Ok(Self::HmacSha256),
            "MD5" => Ok(Self::Md5),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Which label joins the shared secret onto the canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretSuffix {
    /// `&key=<secret>`, used by the payment notification signatures.
    #[default]
    Key,
    /// `&secret=<secret>`, the legacy proxy variant.
    Secret,
}

impl SecretSuffix {
    /// The label written before `=`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Secret => "secret",
        }
    }
}

/// Everything that decides how a parameter map becomes signed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    algorithm: Algorithm,
    charset: String,
    omit: OmitSet,
    secret_suffix: SecretSuffix,
}

impl SigningContext {
    /// A UTF-8 context that omits only the `sign` field.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            charset: "utf-8".to_string(),
            omit: OmitSet::new([SIGN_FIELD]),
            secret_suffix: SecretSuffix::Key,
        }
    }

    /// Build a context from configuration strings.
    ///
    /// Unknown algorithms and non-UTF-8 charsets are rejected here so that a
    /// misconfigured tenant fails at start-up, not on its first request.
    pub fn from_names(algorithm: &str, charset: &str) -> Result<Self, CryptoError> {
        let algorithm = algorithm.parse()?;
        let normalized = charset.trim().to_ascii_lowercase();
        if normalized != "utf-8" && normalized != "utf8" {
            return Err(CryptoError::UnsupportedCharset(charset.to_string()));
        }
        Ok(Self::new(algorithm))
    }

    /// Request signing for open APIs: `sign_type` is part of the signed content.
    pub fn open_api_request(algorithm: Algorithm) -> Self {
        Self::new(algorithm)
    }

    /// Notification verification for open APIs: `sign_type` is excluded too.
    pub fn open_api_notify(algorithm: Algorithm) -> Self {
        Self::new(algorithm).with_omitted(SIGN_TYPE_FIELD)
    }

    /// Legacy payment signatures (`&key=` suffixed MD5 or HMAC-SHA256).
    pub fn legacy_payment(algorithm: Algorithm) -> Self {
        Self::new(algorithm).with_secret_suffix(SecretSuffix::Key)
    }

    /// Exclude one more field from canonicalization.
    pub fn with_omitted(mut self, field: &str) -> Self {
        self.omit = self.omit.with(field);
        self
    }

    /// Choose the shared-secret label for HMAC and MD5 modes.
    pub fn with_secret_suffix(mut self, suffix: SecretSuffix) -> Self {
        self.secret_suffix = suffix;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn omit(&self) -> &OmitSet {
        &self.omit
    }

    pub fn secret_suffix(&self) -> SecretSuffix {
        self.secret_suffix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_round_trip() {
        for alg in [
            Algorithm::RsaSha1,
            Algorithm::RsaSha256,
            Algorithm::HmacSha256,
            Algorithm::Md5,
        ] {
            assert_eq!(alg.as_str().parse::<Algorithm>().unwrap(), alg);
        }
        assert_eq!("sha256WithRSA".parse::<Algorithm>().unwrap(), Algorithm::RsaSha256);
    }

    #[test]
    fn test_unsupported_algorithm_fails_at_configuration() {
        let err = SigningContext::from_names("SM2", "utf-8").unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedAlgorithm(ref name) if name == "SM2"));
    }

    #[test]
    fn test_unsupported_charset_fails_at_configuration() {
        let err = SigningContext::from_names("RSA2", "GBK").unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedCharset(_)));
        assert!(SigningContext::from_names("RSA2", "UTF-8").is_ok());
    }

    #[test]
    fn test_preset_omit_sets() {
        let request = SigningContext::open_api_request(Algorithm::RsaSha256);
        assert!(request.omit().contains("sign"));
        assert!(!request.omit().contains("sign_type"));

        let notify = SigningContext::open_api_notify(Algorithm::RsaSha256);
        assert!(notify.omit().contains("sign"));
        assert!(notify.omit().contains("sign_type"));
    }

    #[test]
    fn test_secret_suffix_labels() {
        let ctx = SigningContext::legacy_payment(Algorithm::Md5);
        assert_eq!(ctx.secret_suffix().label(), "key");
        let ctx = ctx.with_secret_suffix(SecretSuffix::Secret);
        assert_eq!(ctx.secret_suffix().label(), "secret");
    }
}
