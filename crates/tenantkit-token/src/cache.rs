//! Store-backed token slot shared by every provider tier.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::codes::ResponseCodes;
use crate::error::TokenError;
use crate::store::CredentialStore;

/// A token as returned by an issuance endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Token value.
    pub token: String,
    /// Lifetime in seconds as reported by the issuer.
    pub expires_in: u64,
}

impl IssuedToken {
    /// Read `token_field` and `expires_in` from an issuance response.
    ///
    /// `Null` is "no response"; a non-zero code is a [`TokenError::Provider`]
    /// carrying the platform's message.
    pub fn from_response(
        endpoint: &str,
        response: &Value,
        token_field: &'static str,
        codes: &ResponseCodes,
    ) -> Result<Self, TokenError> {
        if response.is_null() {
            return Err(TokenError::Unreachable {
                endpoint: endpoint.to_string(),
            });
        }
        let code = codes.code_of(response);
        if code != 0 {
            return Err(TokenError::Provider {
                code,
                message: codes.message_of(response).unwrap_or_default(),
            });
        }
        let token = response
            .get(token_field)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TokenError::UnexpectedResponse {
                endpoint: endpoint.to_string(),
                field: token_field,
            })?;
        let expires_in = response
            .get("expires_in")
            .and_then(Value::as_u64)
            .ok_or_else(|| TokenError::UnexpectedResponse {
                endpoint: endpoint.to_string(),
                field: "expires_in",
            })?;
        Ok(Self {
            token: token.to_string(),
            expires_in,
        })
    }
}

/// One cached credential: store key, safety margin and a refresh guard.
///
/// The guard makes concurrent cache misses on one slot issue a single
/// fetch; the second waiter finds the fresh token on its re-check.
pub(crate) struct TokenSlot {
    store: Arc<dyn CredentialStore>,
    key: String,
    safety_margin_secs: u64,
    refresh_guard: Mutex<()>,
}

impl TokenSlot {
    pub(crate) fn new(store: Arc<dyn CredentialStore>, key: String, safety_margin_secs: u64) -> Self {
        Self {
            store,
            key,
            safety_margin_secs,
            refresh_guard: Mutex::new(()),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) async fn cached(&self) -> Result<Option<String>, TokenError> {
        self.store.get(&self.key).await
    }

    pub(crate) async fn expires_in(&self) -> Result<Option<u64>, TokenError> {
        self.store.ttl(&self.key).await
    }

    /// Cached token, or the result of `fetch` stored under the slot key.
    pub(crate) async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, TokenError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, TokenError>>,
    {
        if let Some(token) = self.cached().await? {
            tracing::debug!(key = %self.key, "token cache hit");
            return Ok(token);
        }
        let _guard = self.refresh_guard.lock().await;
        if let Some(token) = self.cached().await? {
            tracing::debug!(key = %self.key, "token refreshed by a concurrent caller");
            return Ok(token);
        }
        tracing::debug!(key = %self.key, "token cache miss");
        let issued = fetch().await?;
        self.save(issued).await
    }

    /// Always run `fetch` and overwrite the cached token.
    pub(crate) async fn force_fetch<F, Fut>(&self, fetch: F) -> Result<String, TokenError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, TokenError>>,
    {
        let _guard = self.refresh_guard.lock().await;
        let issued = fetch().await?;
        self.save(issued).await
    }

    async fn save(&self, issued: IssuedToken) -> Result<String, TokenError> {
        let ttl = issued.expires_in.saturating_sub(self.safety_margin_secs);
        if ttl == 0 {
            tracing::warn!(
                key = %self.key,
                expires_in = issued.expires_in,
                "token lifetime within safety margin, not caching"
            );
            self.store.del(&[self.key.as_str()]).await?;
        } else {
            self.store.set(&self.key, &issued.token, Some(ttl)).await?;
            tracing::info!(key = %self.key, ttl, "token refreshed");
        }
        Ok(issued.token)
    }
}
