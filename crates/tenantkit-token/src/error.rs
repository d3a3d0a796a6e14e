//! Error types for credential lifecycle operations.

use std::fmt;

use tenantkit_crypto::CryptoError;

/// Caller-visible failure category.
///
/// Every [`TokenError`] maps to exactly one kind, so callers can branch on
/// "retry later", "fix configuration" and "show the platform's message"
/// without matching individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote authority could not be reached or answered garbage.
    Transport,
    /// The platform reported the credential as invalid or expired.
    CredentialInvalidated,
    /// The platform rejected the call with a business error code.
    Business,
    /// A signature or AEAD tag did not verify.
    Signature,
    /// A parent credential (ticket or suite token) is unavailable.
    Hierarchy,
    /// Bad key material, algorithm name, settings or config file.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::CredentialInvalidated => "credential invalidated",
            Self::Business => "business",
            Self::Signature => "signature",
            Self::Hierarchy => "hierarchy",
            Self::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while obtaining credentials or calling a platform.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-2xx status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// No response at all: connection refused, timeout or empty body.
    #[error("no response from {endpoint}")]
    Unreachable {
        /// Endpoint path that was called.
        endpoint: String,
    },

    /// The response parsed but lacks a required field.
    #[error("unexpected response from {endpoint}: missing {field}")]
    UnexpectedResponse {
        /// Endpoint path that was called.
        endpoint: String,
        /// The missing field.
        field: &'static str,
    },

    /// Failed to serialize or deserialize data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential issuance failed with a platform error code.
    #[error("token issuance failed ({code}): {message}")]
    Provider {
        /// Platform error code.
        code: i64,
        /// Platform error message.
        message: String,
    },

    /// An authenticated call reported the credential as invalid.
    #[error("credential invalidated ({code}): {message}")]
    CredentialInvalidated {
        /// Platform error code.
        code: i64,
        /// Platform error message.
        message: String,
    },

    /// An authenticated call failed with a business error code.
    #[error("platform error ({code}): {message}")]
    Business {
        /// Platform error code.
        code: i64,
        /// Message from the code table, or the platform's own message.
        message: String,
    },

    /// A suite refresh needs a pushed ticket and none is cached.
    #[error("missing suite ticket for {suite_id}")]
    MissingTicket {
        /// Suite whose ticket is absent.
        suite_id: String,
    },

    /// The credential store backend failed.
    #[error("credential store error: {0}")]
    Store(String),

    /// Invalid settings or credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A signing or payload crypto error.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl TokenError {
    /// The caller-visible category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_)
            | Self::HttpStatus { .. }
            | Self::Unreachable { .. }
            | Self::UnexpectedResponse { .. }
            | Self::Serialization(_)
            | Self::Store(_) => ErrorKind::Transport,
            Self::CredentialInvalidated { .. } => ErrorKind::CredentialInvalidated,
            Self::Provider { .. } | Self::Business { .. } => ErrorKind::Business,
            Self::MissingTicket { .. } => ErrorKind::Hierarchy,
            Self::Config(_) | Self::Io(_) => ErrorKind::Configuration,
            Self::Crypto(e) => match e {
                CryptoError::SignatureInvalid | CryptoError::AuthenticationFailed => {
                    ErrorKind::Signature
                }
                CryptoError::InvalidKey(_)
                | CryptoError::KeyMismatch { .. }
                | CryptoError::UnsupportedAlgorithm(_)
                | CryptoError::UnsupportedCharset(_)
                | CryptoError::Certificate(_) => ErrorKind::Configuration,
                _ => ErrorKind::Business,
            },
        }
    }

    /// The platform error code, when there is one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Provider { code, .. }
            | Self::CredentialInvalidated { code, .. }
            | Self::Business { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let unreachable = TokenError::Unreachable {
            endpoint: "/cgi-bin/gettoken".into(),
        };
        assert_eq!(unreachable.kind(), ErrorKind::Transport);
        assert_eq!(
            TokenError::MissingTicket { suite_id: "s".into() }.kind(),
            ErrorKind::Hierarchy
        );
        assert_eq!(
            TokenError::Crypto(CryptoError::AuthenticationFailed).kind(),
            ErrorKind::Signature
        );
        assert_eq!(
            TokenError::Crypto(CryptoError::UnsupportedAlgorithm("SM2".into())).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(TokenError::Config("x".into()).kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_code() {
        let err = TokenError::Business {
            code: 60011,
            message: "no privilege".into(),
        };
        assert_eq!(err.code(), Some(60011));
        assert_eq!(err.kind(), ErrorKind::Business);
        assert!(err.to_string().contains("no privilege"));
        assert_eq!(TokenError::Store("down".into()).code(), None);
    }
}
