//! Header-authenticated payment requests.
//!
//! Outbound requests carry an `Authorization` header built from an RSA-SHA256
//! signature over `METHOD\nPATH\nTIMESTAMP\nNONCE\nBODY\n`. Responses and
//! notifications are signed by the platform over `TIMESTAMP\nNONCE\nBODY\n`
//! and identify the signing certificate by serial in `Wechatpay-Serial`.

use std::collections::HashMap;

use tenantkit_primitives::message::{header_parameters, request_sign_message, response_sign_message};
use tenantkit_primitives::util::{random_nonce, unix_timestamp, DEFAULT_NONCE_LEN};

use crate::certificate::{merchant_serial_no, public_key_from_certificate};
use crate::keys::{PrivateKey, PublicKey};
use crate::signing::{rsa_sign_sha256, rsa_verify_sha256, Verification};
use crate::CryptoError;

/// Scheme token that prefixes the `Authorization` header value.
pub const AUTHORIZATION_SCHEME: &str = "WECHATPAY2-SHA256-RSA2048";

pub const HEADER_TIMESTAMP: &str = "Wechatpay-Timestamp";
pub const HEADER_NONCE: &str = "Wechatpay-Nonce";
pub const HEADER_SIGNATURE: &str = "Wechatpay-Signature";
pub const HEADER_SERIAL: &str = "Wechatpay-Serial";

/// Produces `Authorization` header values for one merchant.
#[derive(Debug, Clone)]
pub struct AuthorizationSigner {
    merchant_id: String,
    serial_no: String,
    private_key: PrivateKey,
}

impl AuthorizationSigner {
    pub fn new(
        merchant_id: impl Into<String>,
        serial_no: impl Into<String>,
        private_key: PrivateKey,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            serial_no: serial_no.into(),
            private_key,
        }
    }

    /// Build a signer whose `serial_no` is read from the merchant certificate.
    pub fn from_certificate(
        merchant_id: impl Into<String>,
        certificate_pem: &str,
        private_key: PrivateKey,
    ) -> Result<Self, CryptoError> {
        let serial_no = merchant_serial_no(certificate_pem)?;
        Ok(Self::new(merchant_id, serial_no, private_key))
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn serial_no(&self) -> &str {
        &self.serial_no
    }

    /// RSA-SHA256 signature over an arbitrary message, base64 encoded.
    ///
    /// Also used for the client-side payment invocation (`paySign`) parameters.
    pub fn sign_message(&self, message: &str) -> Result<String, CryptoError> {
        rsa_sign_sha256(&self.private_key, message.as_bytes())
    }

    /// Header value for a request, with a fresh nonce and the current time.
    pub fn authorization(&self, method: &str, path: &str, body: &str) -> Result<String, CryptoError> {
        let nonce = random_nonce(DEFAULT_NONCE_LEN);
        self.authorization_with(method, path, body, unix_timestamp(), &nonce)
    }

    /// Header value for a request with an explicit timestamp and nonce.
    pub fn authorization_with(
        &self,
        method: &str,
        path: &str,
        body: &str,
        timestamp: i64,
        nonce: &str,
    ) -> Result<String, CryptoError> {
        let message = request_sign_message(method, path, timestamp, nonce, body)?;
        let signature = self.sign_message(&message)?;
        let timestamp = timestamp.to_string();
        tracing::debug!(mchid = %self.merchant_id, method, path, "signed request");
        Ok(header_parameters(
            AUTHORIZATION_SCHEME,
            &[
                ("mchid", self.merchant_id.as_str()),
                ("nonce_str", nonce),
                ("signature", signature.as_str()),
                ("timestamp", timestamp.as_str()),
                ("serial_no", self.serial_no.as_str()),
            ],
        ))
    }
}

/// Signature headers of a platform response or notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub serial: String,
}

impl ResponseHeaders {
    /// Collect the four signature headers from name/value pairs.
    ///
    /// Header names are matched case-insensitively. Returns
    /// [`CryptoError::MalformedEnvelope`] naming the first missing header.
    pub fn from_pairs<I, K, V>(headers: I) -> Result<Self, CryptoError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut timestamp = None;
        let mut nonce = None;
        let mut signature = None;
        let mut serial = None;
        for (name, value) in headers {
            let name = name.as_ref();
            let slot = if name.eq_ignore_ascii_case(HEADER_TIMESTAMP) {
                &mut timestamp
            } else if name.eq_ignore_ascii_case(HEADER_NONCE) {
                &mut nonce
            } else if name.eq_ignore_ascii_case(HEADER_SIGNATURE) {
                &mut signature
            } else if name.eq_ignore_ascii_case(HEADER_SERIAL) {
                &mut serial
            } else {
                continue;
            };
            *slot = Some(value.as_ref().to_string());
        }
        let missing = |header: &str| CryptoError::MalformedEnvelope(format!("missing {header} header"));
        Ok(Self {
            timestamp: timestamp.ok_or_else(|| missing(HEADER_TIMESTAMP))?,
            nonce: nonce.ok_or_else(|| missing(HEADER_NONCE))?,
            signature: signature.ok_or_else(|| missing(HEADER_SIGNATURE))?,
            serial: serial.ok_or_else(|| missing(HEADER_SERIAL))?,
        })
    }
}

/// Platform certificate public keys indexed by serial number.
#[derive(Debug, Clone, Default)]
pub struct PlatformCertificates {
    keys: HashMap<String, PublicKey>,
}

impl PlatformCertificates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, serial: impl Into<String>, key: PublicKey) {
        self.keys.insert(serial.into().to_ascii_uppercase(), key);
    }

    /// Register a platform certificate PEM under its own serial number.
    pub fn insert_pem(&mut self, certificate_pem: &str) -> Result<String, CryptoError> {
        let serial = merchant_serial_no(certificate_pem)?;
        let key = public_key_from_certificate(certificate_pem.as_bytes())?;
        self.insert(serial.clone(), key);
        Ok(serial)
    }

    pub fn get(&self, serial: &str) -> Option<&PublicKey> {
        self.keys.get(&serial.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify a response or notification body against its signature headers.
    ///
    /// An unknown serial or malformed timestamp is reported as invalid.
    pub fn verify_response(&self, headers: &ResponseHeaders, body: &str) -> Verification {
        let Some(key) = self.get(&headers.serial) else {
            tracing::warn!(serial = %headers.serial, "no platform certificate for response serial");
            return Verification::Invalid;
        };
        let message = match response_sign_message(&headers.timestamp, &headers.nonce, body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "malformed response signature headers");
                return Verification::Invalid;
            }
        };
        rsa_verify_sha256(key, message.as_bytes(), &headers.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_PRIVATE: &str = include_str!("../tests/fixtures/app_private_key.pem");
    const APP_CERT: &str = include_str!("../tests/fixtures/app_cert.pem");
    const PLATFORM_PRIVATE: &str = include_str!("../tests/fixtures/platform_private_key.pem");

    fn signer() -> AuthorizationSigner {
        AuthorizationSigner::new(
            "1900009191",
            "4F3C2A1B00FF19",
            PrivateKey::parse(APP_PRIVATE).unwrap(),
        )
    }

    #[test]
    fn test_authorization_header_layout() {
        let signer = signer();
        let header = signer
            .authorization_with("POST", "/v3/pay/transactions/jsapi", "{}", 1554208460, "593BEC0C")
            .unwrap();
        let expected_signature = signer
            .sign_message("POST\n/v3/pay/transactions/jsapi\n1554208460\n593BEC0C\n{}\n")
            .unwrap();
        assert_eq!(
            header,
            format!(
                "WECHATPAY2-SHA256-RSA2048 mchid=\"1900009191\",nonce_str=\"593BEC0C\",serial_no=\"4F3C2A1B00FF19\",signature=\"{expected_signature}\",timestamp=\"1554208460\""
            )
        );
    }

    #[test]
    fn test_authorization_signature_verifies() {
        let signer = signer();
        let header = signer
            .authorization_with("GET", "/v3/certificates", "", 1700000000, "abc")
            .unwrap();
        let signature = header
            .split("signature=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        let public = PrivateKey::parse(APP_PRIVATE).unwrap().public_key();
        let message = "GET\n/v3/certificates\n1700000000\nabc\n\n";
        assert!(rsa_verify_sha256(&public, message.as_bytes(), signature).is_valid());
    }

    #[test]
    fn test_authorization_uses_fresh_nonce() {
        let signer = signer();
        let a = signer.authorization("GET", "/v3/certificates", "").unwrap();
        let b = signer.authorization("GET", "/v3/certificates", "").unwrap();
        assert!(a.starts_with(AUTHORIZATION_SCHEME));
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorization_rejects_full_url() {
        assert!(signer()
            .authorization_with("GET", "https://api.mch.weixin.qq.com/v3/certificates", "", 1, "n")
            .is_err());
    }

    #[test]
    fn test_signer_from_certificate() {
        let signer = AuthorizationSigner::from_certificate(
            "1900009191",
            APP_CERT,
            PrivateKey::parse(APP_PRIVATE).unwrap(),
        )
        .unwrap();
        assert_eq!(signer.serial_no(), "4F3C2A1B00FF19");
        assert_eq!(signer.merchant_id(), "1900009191");
    }

    fn signed_response(body: &str) -> ResponseHeaders {
        let platform = PrivateKey::parse(PLATFORM_PRIVATE).unwrap();
        let message = response_sign_message("1554209980", "c5ac7061", body).unwrap();
        ResponseHeaders {
            timestamp: "1554209980".into(),
            nonce: "c5ac7061".into(),
            signature: rsa_sign_sha256(&platform, message.as_bytes()).unwrap(),
            serial: "5157F09EFDC096DE15EBE81A47057A7232F1B8E1".into(),
        }
    }

    fn platform_certs() -> PlatformCertificates {
        let mut certs = PlatformCertificates::new();
        let platform = PrivateKey::parse(PLATFORM_PRIVATE).unwrap();
        certs.insert("5157f09efdc096de15ebe81a47057a7232f1b8e1", platform.public_key());
        certs
    }

    #[test]
    fn test_verify_response() {
        let body = r#"{"code_url":"weixin://wxpay/bizpayurl?pr=p4lpSuKzz"}"#;
        let headers = signed_response(body);
        assert!(platform_certs().verify_response(&headers, body).is_valid());
        assert!(!platform_certs().verify_response(&headers, "{}").is_valid());
    }

    #[test]
    fn test_verify_response_unknown_serial() {
        let mut headers = signed_response("{}");
        headers.serial = "DEADBEEF".into();
        assert_eq!(platform_certs().verify_response(&headers, "{}"), Verification::Invalid);
    }

    #[test]
    fn test_verify_response_bad_timestamp() {
        let mut headers = signed_response("{}");
        headers.timestamp = "soon".into();
        assert!(!platform_certs().verify_response(&headers, "{}").is_valid());
    }

    #[test]
    fn test_response_headers_from_pairs() {
        let headers = ResponseHeaders::from_pairs([
            ("wechatpay-timestamp", "1"),
            ("Content-Type", "application/json"),
            ("WECHATPAY-NONCE", "n"),
            ("Wechatpay-Signature", "sig"),
            ("Wechatpay-Serial", "ABC"),
        ])
        .unwrap();
        assert_eq!(headers.timestamp, "1");
        assert_eq!(headers.nonce, "n");
        assert_eq!(headers.serial, "ABC");

        let err = ResponseHeaders::from_pairs([("Wechatpay-Timestamp", "1")]).unwrap_err();
        assert!(err.to_string().contains(HEADER_NONCE));
    }

    #[test]
    fn test_insert_pem_uses_certificate_serial() {
        let mut certs = PlatformCertificates::new();
        assert_eq!(certs.insert_pem(APP_CERT).unwrap(), "4F3C2A1B00FF19");
        assert!(certs.get("4f3c2a1b00ff19").is_some());
        assert_eq!(certs.len(), 1);
    }
}
