//! Provider, suite and corp token tiers.
//!
//! ```text
//! provider secret ──▶ provider_access_token
//! suite secret + pushed ticket ──▶ suite_access_token
//! suite_access_token + permanent code ──▶ corp access_token
//! ```
//!
//! A suite token can only be issued while a ticket is cached, and a corp
//! token only with a valid suite token. When the issuer reports the suite
//! token as expired, the corp tier force-refreshes the suite tier once and
//! retries its own issuance once.

use std::sync::Arc;

use serde_json::json;

use crate::cache::{IssuedToken, TokenSlot};
use crate::codes::ResponseCodes;
use crate::config::{CorpAuthorization, ProviderCredentials, SuiteCredentials, TokenSettings};
use crate::error::TokenError;
use crate::source::TokenSource;
use crate::store::CredentialStore;
use crate::transport::{endpoint_url, Transport};

/// Issuance endpoint for provider tokens.
pub const PROVIDER_TOKEN_PATH: &str = "/cgi-bin/service/get_provider_token";
/// Issuance endpoint for suite tokens.
pub const SUITE_TOKEN_PATH: &str = "/cgi-bin/service/get_suite_token";
/// Issuance endpoint for authorized-corp tokens.
pub const CORP_TOKEN_PATH: &str = "/cgi-bin/service/get_corp_token";

/// Provider tier: a flat token keyed by the provider corp id.
pub struct ProviderTokenProvider {
    credentials: ProviderCredentials,
    settings: TokenSettings,
    transport: Arc<dyn Transport>,
    codes: ResponseCodes,
    slot: TokenSlot,
}

impl ProviderTokenProvider {
    /// Create a provider-tier token source.
    pub fn new(
        credentials: ProviderCredentials,
        settings: TokenSettings,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let key = settings.store_key(&format!("provider_token:{}", credentials.corp_id));
        let slot = TokenSlot::new(store, key, settings.safety_margin_secs);
        Self {
            credentials,
            settings,
            transport,
            codes: ResponseCodes::WECOM,
            slot,
        }
    }

    async fn fetch(&self) -> Result<IssuedToken, TokenError> {
        let url = endpoint_url(&self.settings.base_url, PROVIDER_TOKEN_PATH, &[])?;
        let body = json!({
            "corpid": self.credentials.corp_id,
            "provider_secret": self.credentials.provider_secret,
        });
        let response = self.transport.post(&url, &body).await?;
        IssuedToken::from_response(PROVIDER_TOKEN_PATH, &response, "provider_access_token", &self.codes)
    }
}

impl TokenSource for ProviderTokenProvider {
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

/// Suite tier: needs the ticket the platform pushes every few minutes.
pub struct SuiteTokenProvider {
    credentials: SuiteCredentials,
    settings: TokenSettings,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    codes: ResponseCodes,
    ticket_key: String,
    slot: TokenSlot,
}

impl SuiteTokenProvider {
    /// Create a suite-tier token source.
    pub fn new(
        credentials: SuiteCredentials,
        settings: TokenSettings,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let key = settings.store_key(&format!("suite_token:{}", credentials.suite_id));
        let ticket_key = settings.store_key(&format!("suite_ticket:{}", credentials.suite_id));
        let slot = TokenSlot::new(store.clone(), key, settings.safety_margin_secs);
        Self {
            credentials,
            settings,
            store,
            transport,
            codes: ResponseCodes::WECOM,
            ticket_key,
            slot,
        }
    }

    /// Suite this provider issues tokens for.
    pub fn suite_id(&self) -> &str {
        &self.credentials.suite_id
    }

    /// Cache a ticket pushed by the platform, exactly as received.
    ///
    /// No safety margin is applied: `ttl_secs` is stored as given, and
    /// `None` keeps the ticket until the next push replaces it.
    pub async fn store_ticket(&self, ticket: &str, ttl_secs: Option<u64>) -> Result<(), TokenError> {
        self.store.set(&self.ticket_key, ticket, ttl_secs).await?;
        tracing::info!(suite_id = %self.credentials.suite_id, "suite ticket stored");
        Ok(())
    }

    /// The currently cached ticket.
    pub async fn ticket(&self) -> Result<Option<String>, TokenError> {
        self.store.get(&self.ticket_key).await
    }

    async fn fetch(&self) -> Result<IssuedToken, TokenError> {
        let Some(ticket) = self.ticket().await? else {
            tracing::warn!(suite_id = %self.credentials.suite_id, "suite refresh without a cached ticket");
            return Err(TokenError::MissingTicket {
                suite_id: self.credentials.suite_id.clone(),
            });
        };
        let url = endpoint_url(&self.settings.base_url, SUITE_TOKEN_PATH, &[])?;
        let body = json!({
            "suite_id": self.credentials.suite_id,
            "suite_secret": self.credentials.suite_secret,
            "suite_ticket": ticket,
        });
        let response = self.transport.post(&url, &body).await?;
        IssuedToken::from_response(SUITE_TOKEN_PATH, &response, "suite_access_token", &self.codes)
    }
}

impl TokenSource for SuiteTokenProvider {
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

/// Corp tier: an authorized corp's token, issued through its suite.
pub struct CorpTokenProvider {
    authorization: CorpAuthorization,
    settings: TokenSettings,
    suite: Arc<SuiteTokenProvider>,
    transport: Arc<dyn Transport>,
    codes: ResponseCodes,
    slot: TokenSlot,
}

impl CorpTokenProvider {
    /// Create a corp-tier token source under `suite`.
    ///
    /// Returns [`TokenError::Config`] when the authorization names a
    /// different suite than the one given.
    pub fn new(
        authorization: CorpAuthorization,
        settings: TokenSettings,
        suite: Arc<SuiteTokenProvider>,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, TokenError> {
        if authorization.suite_id != suite.suite_id() {
            return Err(TokenError::Config(format!(
                "authorization for suite {} given suite provider {}",
                authorization.suite_id,
                suite.suite_id()
            )));
        }
        let key = settings.store_key(&format!(
            "corp_token:{}:{}",
            authorization.suite_id, authorization.permanent_code
        ));
        let slot = TokenSlot::new(store, key, settings.safety_margin_secs);
        Ok(Self {
            authorization,
            settings,
            suite,
            transport,
            codes: ResponseCodes::WECOM,
            slot,
        })
    }

    /// The authorized corp.
    pub fn auth_corp_id(&self) -> &str {
        &self.authorization.auth_corp_id
    }

    async fn issue_with(&self, suite_token: &str) -> Result<IssuedToken, TokenError> {
        let url = endpoint_url(
            &self.settings.base_url,
            CORP_TOKEN_PATH,
            &[("suite_access_token", suite_token)],
        )?;
        let body = json!({
            "auth_corpid": self.authorization.auth_corp_id,
            "permanent_code": self.authorization.permanent_code,
        });
        let response = self.transport.post(&url, &body).await?;
        IssuedToken::from_response(CORP_TOKEN_PATH, &response, "access_token", &self.codes)
    }

    async fn fetch(&self) -> Result<IssuedToken, TokenError> {
        let suite_token = self.suite.get_token().await?;
        match self.issue_with(&suite_token).await {
            Err(TokenError::Provider { code, .. }) if Some(code) == self.codes.suite_token_expired => {
                tracing::warn!(
                    suite_id = %self.authorization.suite_id,
                    auth_corp_id = %self.authorization.auth_corp_id,
                    "suite token expired during corp refresh, refreshing suite"
                );
                let suite_token = self.suite.refresh().await?;
                self.issue_with(&suite_token).await
            }
            other => other,
        }
    }
}

impl TokenSource for CorpTokenProvider {
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
