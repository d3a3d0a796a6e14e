#![deny(missing_docs)]

//! # tenantkit-token
//!
//! Credential lifecycle for multi-tenant platform integrations: cached
//! bearer tokens with transparent refresh, a provider → suite → corp token
//! hierarchy, and a retry-once wrapper for calls that report their
//! credential as invalidated.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tenantkit_token::{
//!     AccessTokenProvider, CorpCredentials, HttpTransport, MemoryStore, TokenSettings,
//!     TokenSource,
//! };
//!
//! # async fn run() -> Result<(), tenantkit_token::TokenError> {
//! let settings = TokenSettings::default();
//! let transport = Arc::new(HttpTransport::new(&settings)?);
//! let provider = AccessTokenProvider::new(
//!     CorpCredentials {
//!         corp_id: "ww1".to_string(),
//!         corp_secret: "secret".to_string(),
//!         agent_id: None,
//!     },
//!     settings,
//!     Arc::new(MemoryStore::new()),
//!     transport,
//! );
//! let token = provider.get_token().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod codes;
pub mod config;
pub mod error;
pub mod flat;
pub mod hierarchy;
pub mod registry;
pub mod retry;
pub mod source;
pub mod store;
pub mod transport;


pub use cache::IssuedToken;
pub use codes::ResponseCodes;
pub use config::{
    CorpAuthorization, CorpCredentials, ProviderCredentials, SuiteCredentials, TenantkitConfig,
    TokenSettings,
};
pub use error::{ErrorKind, TokenError};
pub use flat::AccessTokenProvider;
pub use hierarchy::{CorpTokenProvider, ProviderTokenProvider, SuiteTokenProvider};
pub use registry::TenantRegistry;
pub use retry::InvalidationRetry;
pub use source::TokenSource;
pub use store::{CredentialStore, MemoryStore};
pub use transport::{HttpTransport, Transport};
