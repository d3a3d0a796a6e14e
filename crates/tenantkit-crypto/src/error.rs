/// Error types for signing, verification and payload crypto.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Key material could not be parsed or has the wrong shape.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The key kind does not match the algorithm in the signing context.
    #[error("{algorithm} requires {expected} key material")]
    KeyMismatch {
        /// Algorithm name from the signing context.
        algorithm: &'static str,
        /// The key kind the algorithm needs.
        expected: &'static str,
    },

    /// Algorithm name not recognized at configuration time.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Only UTF-8 canonical strings are produced.
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Nothing signable survived canonicalization.
    #[error("no signable fields: canonical string is empty")]
    EmptyCanonical,

    /// RSA signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A signature did not verify against the signed content.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// AEAD tag mismatch: ciphertext, nonce, AAD or key were altered.
    #[error("payload authentication failed")]
    AuthenticationFailed,

    /// Ciphertext envelope is malformed (too short, wrong nonce length, ...).
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Encryption of a field or payload failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// RSA-OAEP decryption failed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Certificate could not be parsed.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// A response or notification envelope is missing a required part.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON serialization or deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error from the primitives layer.
    #[error("primitives error: {0}")]
    Primitives(#[from] tenantkit_primitives::PrimitivesError),
}
