#![deny(missing_docs)]

//! tenantkit - Credential lifecycle and signing core.
//!
//! Re-exports all tenantkit components for convenient single-crate usage.

pub use tenantkit_crypto as crypto;
pub use tenantkit_primitives as primitives;
pub use tenantkit_token as token;

pub mod logging;

pub use tenantkit_crypto::{CryptoError, SigningContext, Verification};
pub use tenantkit_token::{ErrorKind, TokenError, TokenSource};
