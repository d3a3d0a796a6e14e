//! tenantkit - Signing engine and payload crypto.
//!
//! Provides the signature conventions the supported platforms use for
//! outbound requests and inbound payloads:
//!
//! - parameter-sorting signatures (RSA-SHA1, RSA-SHA256, HMAC-SHA256, MD5)
//! - header-authenticated payment requests and response verification
//! - signed query assembly and response-node verification for open APIs
//! - AES-256-GCM webhook resource decryption
//! - RSA-OAEP sensitive-field encryption
//! - X.509 certificate serial tokens

mod error;
pub mod aead;
pub mod authorization;
pub mod certificate;
pub mod context;
pub mod keys;
pub mod oaep;
pub mod query;
pub mod signing;

pub use error::CryptoError;
pub use aead::{decrypt_resource, seal_resource, EncryptedResource};
pub use authorization::{
    AuthorizationSigner, PlatformCertificates, ResponseHeaders, AUTHORIZATION_SCHEME,
};
pub use certificate::{
    app_cert_sn, merchant_serial_no, public_key_from_certificate, resolve_serial, root_cert_sn,
    RSA_SIGNATURE_OID_PREFIX,
};
pub use context::{Algorithm, SecretSuffix, SigningContext};
pub use keys::{PrivateKey, PublicKey};
pub use oaep::{decrypt_field, encrypt_field};
pub use query::{open_response, verify_notification, verify_response_node, OpenApiSigner};
pub use signing::{
    sign, sign_canonical, verify, verify_canonical, SigningKey, Verification, VerifyingKey,
};
