//! Nonce and clock helpers shared by the signing paths.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the nonce the payment gateway documents for `nonce_str`.
pub const DEFAULT_NONCE_LEN: usize = 32;

/// Generate a random alphanumeric nonce of `len` characters.
pub fn random_nonce(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Current unix time in whole seconds.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
