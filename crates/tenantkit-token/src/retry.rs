//! Retry-once wrapper for authenticated calls.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::codes::ResponseCodes;
use crate::error::TokenError;
use crate::source::TokenSource;

/// Wraps authenticated API calls with a single refresh-and-retry.
///
/// The call is handed the current token. When the response carries an
/// invalidation code, the token is force-refreshed and the call runs one
/// more time with the new token. A second invalidation is reported as a
/// [`TokenError::Business`] error; there is never a third attempt.
pub struct InvalidationRetry<S> {
    source: Arc<S>,
    codes: ResponseCodes,
}

impl<S> Clone for InvalidationRetry<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            codes: self.codes,
        }
    }
}

impl<S: TokenSource> InvalidationRetry<S> {
    /// Wrap `source`, classifying responses with `codes`.
    pub fn new(source: Arc<S>, codes: ResponseCodes) -> Self {
        Self { source, codes }
    }

    /// The wrapped token source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Run `call` with a token, retrying once on credential invalidation.
    ///
    /// # Arguments
    /// * `endpoint` - Name used in "no response" errors and logs.
    /// * `call` - Performs the request with the given token and returns the
    ///   raw JSON response (`Null` when nothing came back).
    ///
    /// # Returns
    /// The response with its code and message fields stripped.
    pub async fn call<F, Fut>(&self, endpoint: &str, call: F) -> Result<Value, TokenError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value, TokenError>>,
    {
        let token = self.source.get_token().await?;
        let first = self.codes.check(endpoint, call(token).await?);
        let code = match first {
            Err(TokenError::CredentialInvalidated { code, .. }) => code,
            other => return other,
        };

        tracing::warn!(endpoint, code, "credential invalidated, refreshing and retrying once");
        let token = self.source.refresh().await?;
        match self.codes.check(endpoint, call(token).await?) {
            Err(TokenError::CredentialInvalidated { code, message }) => {
                tracing::warn!(endpoint, code, "credential still invalid after refresh");
                Err(self.codes.business(code, message))
            }
            other => other,
        }
    }
}
