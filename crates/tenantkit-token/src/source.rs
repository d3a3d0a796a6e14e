//! The contract every token tier exposes.

use std::future::Future;
use std::sync::Arc;

use crate::error::TokenError;

/// A refreshable bearer credential.
pub trait TokenSource: Send + Sync {
    /// Cached token, refreshing first when the store has none.
    fn get_token(&self) -> impl Future<Output = Result<String, TokenError>> + Send;

    /// Remaining seconds of the cached token, as reported by the store.
    fn token_expires_in(&self) -> impl Future<Output = Result<Option<u64>, TokenError>> + Send;

    /// Fetch a new token from the issuer and cache it, unconditionally.
    fn refresh(&self) -> impl Future<Output = Result<String, TokenError>> + Send;
}

impl<T: TokenSource> TokenSource for Arc<T> {
    fn get_token(&self) -> impl Future<Output = Result<String, TokenError>> + Send {
        T::get_token(self)
    }

    fn token_expires_in(&self) -> impl Future<Output = Result<Option<u64>, TokenError>> + Send {
        T::token_expires_in(self)
    }

    fn refresh(&self) -> impl Future<Output = Result<String, TokenError>> + Send {
        T::refresh(self)
    }
}
