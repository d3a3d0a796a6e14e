/// tenantkit - Hashing, canonicalization and message-building primitives.
///
/// This crate provides the deterministic building blocks every platform
/// signature convention is layered on:
/// - MD5 and HMAC-SHA256 digests with hex helpers
/// - The canonical `key=value&...` parameter encoder
/// - The newline-terminated request sign message used by header signing
/// - `encodeURIComponent`-compatible query assembly
/// - Nonce and timestamp helpers

pub mod hash;
pub mod canonical;
pub mod message;
pub mod util;

mod error;
pub use error::PrimitivesError;

pub use canonical::{canonicalize, stringify_value, OmitSet};
