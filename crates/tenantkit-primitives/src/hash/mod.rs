//! Hash function primitives for tenantkit.
//!
//! Provides MD5 and HMAC-SHA256 digests plus the
//! upper-case hex rendering the legacy payment signatures expect.

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Compute the MD5 digest of the input data.
///
/// MD5 is only used where a remote platform mandates it (legacy payment
/// signatures and certificate serial tokens).
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 16-byte MD5 digest.
pub fn md5(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the MD5 digest of the input data as lower-case hex.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5(data))
}

/// Compute HMAC-SHA256 of the input data with the given key.
///
/// # Arguments
/// * `key` - The HMAC key bytes.
/// * `data` - The message bytes to authenticate.
///
/// # Returns
/// A 32-byte HMAC-SHA256 tag.
pub fn sha256_hmac(key: &[u8], data: &[u8]) -> [u8; 32] {
    type HmacSha256 = Hmac<Sha256>;
    // HMAC takes keys of any length, so construction cannot fail.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Render bytes as upper-case hex, the form every "key=" style signature uses.
pub fn upper_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Compare two byte strings without short-circuiting on the first difference.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- MD5 ----

    #[test]
    fn test_md5_empty_string() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_md5_string() {
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    // ---- HMAC-SHA256 (RFC 4231 test case 2) ----

    #[test]
    fn test_sha256_hmac_rfc4231() {
        let tag = sha256_hmac(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_upper_hex() {
        assert_eq!(upper_hex(&[0xab, 0x01, 0xff]), "AB01FF");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
