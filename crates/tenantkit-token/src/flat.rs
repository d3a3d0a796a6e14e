//! Flat access token: one corp secret, one token.

use std::sync::Arc;

use crate::cache::{IssuedToken, TokenSlot};
use crate::codes::ResponseCodes;
use crate::config::{CorpCredentials, TokenSettings};
use crate::error::TokenError;
use crate::source::TokenSource;
use crate::store::CredentialStore;
use crate::transport::{endpoint_url, Transport};

/// Issuance endpoint for corp access tokens.
pub const GET_TOKEN_PATH: &str = "/cgi-bin/gettoken";

/// Access token for a corp's own application.
pub struct AccessTokenProvider {
    credentials: CorpCredentials,
    settings: TokenSettings,
    transport: Arc<dyn Transport>,
    codes: ResponseCodes,
    slot: TokenSlot,
}

impl AccessTokenProvider {
    /// Create a provider. No token is fetched until first use.
    pub fn new(
        credentials: CorpCredentials,
        settings: TokenSettings,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let key = match &credentials.agent_id {
            Some(agent) => format!("access_token:{}:{agent}", credentials.corp_id),
            None => format!("access_token:{}", credentials.corp_id),
        };
        let slot = TokenSlot::new(store, settings.store_key(&key), settings.safety_margin_secs);
        Self {
            credentials,
            settings,
            transport,
            codes: ResponseCodes::WECOM,
            slot,
        }
    }

    /// Use a different response code table.
    pub fn with_codes(mut self, codes: ResponseCodes) -> Self {
        self.codes = codes;
        self
    }

    /// Corp this provider issues tokens for.
    pub fn corp_id(&self) -> &str {
        &self.credentials.corp_id
    }

    /// Credential store key of the cached token.
    pub fn store_key(&self) -> &str {
        self.slot.key()
    }

    async fn fetch(&self) -> Result<IssuedToken, TokenError> {
        let url = endpoint_url(
            &self.settings.base_url,
            GET_TOKEN_PATH,
            &[
                ("corpid", self.credentials.corp_id.as_str()),
                ("corpsecret", self.credentials.corp_secret.as_str()),
            ],
        )?;
        let response = self.transport.get(&url).await?;
        IssuedToken::from_response(GET_TOKEN_PATH, &response, "access_token", &self.codes)
    }
}

impl TokenSource for AccessTokenProvider {
    async fn get_token(&self) -> Result<String, TokenError> {
        self.slot.get_or_fetch(|| self.fetch()).await
    }

    async fn token_expires_in(&self) -> Result<Option<u64>, TokenError> {
        self.slot.expires_in().await
    }

    async fn refresh(&self) -> Result<String, TokenError> {
        self.slot.force_fetch(|| self.fetch()).await
    }
}
