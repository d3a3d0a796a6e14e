//! Sign-message and wire-string builders.
//!
//! These are the non-canonical inputs to signatures: the newline-terminated
//! request tuple used by header-authenticated payment APIs, the matching
//! response tuple, the quoted `k="v"` header parameter list and the
//! percent-encoded signed query string.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::PrimitivesError;

/// Characters left unescaped by ECMAScript `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build the request sign message for header signing.
///
/// Format: `METHOD\nPATH\nTIMESTAMP\nNONCE\nBODY\n`. Every component,
/// including the last, is newline-terminated. `path` is the absolute path
/// plus query string, never a full URL.
///
/// # Arguments
/// * `method` - Upper-case HTTP method.
/// * `path` - Request path and query, starting with `/`.
/// * `timestamp` - Unix timestamp in seconds.
/// * `nonce` - Random request nonce.
/// * `body` - Exact request body (empty for GET).
pub fn request_sign_message(
    method: &str,
    path: &str,
    timestamp: i64,
    nonce: &str,
    body: &str,
) -> Result<String, PrimitivesError> {
    if method.is_empty() || method.chars().any(|c| !c.is_ascii_uppercase()) {
        return Err(PrimitivesError::InvalidMessageComponent {
            field: "method",
            reason: format!("expected an upper-case HTTP method, got {method:?}"),
        });
    }
    if !path.starts_with('/') {
        return Err(PrimitivesError::InvalidMessageComponent {
            field: "path",
            reason: format!("expected an absolute path, got {path:?}"),
        });
    }
    check_nonce(nonce)?;
    Ok(format!("{method}\n{path}\n{timestamp}\n{nonce}\n{body}\n"))
}

/// Build the response verification message: `TIMESTAMP\nNONCE\nBODY\n`.
pub fn response_sign_message(
    timestamp: &str,
    nonce: &str,
    body: &str,
) -> Result<String, PrimitivesError> {
    if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PrimitivesError::InvalidMessageComponent {
            field: "timestamp",
            reason: format!("expected unix seconds, got {timestamp:?}"),
        });
    }
    check_nonce(nonce)?;
    Ok(format!("{timestamp}\n{nonce}\n{body}\n"))
}

fn check_nonce(nonce: &str) -> Result<(), PrimitivesError> {
    if nonce.is_empty() || nonce.contains('\n') {
        return Err(PrimitivesError::InvalidMessageComponent {
            field: "nonce",
            reason: "nonce must be non-empty and single-line".to_string(),
        });
    }
    Ok(())
}

/// Assemble a `scheme k1="v1",k2="v2"` header value.
///
/// Pairs are sorted ascending by key (the same ordering rule as the
/// canonical encoder) before being quoted and comma-joined.
pub fn header_parameters(scheme: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!("{scheme} {joined}")
}

/// Percent-encode a string with `encodeURIComponent` rules.
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Build a signed query string.
///
/// Each pair is individually percent-encoded and joined with `&`;
/// `sign=<encoded signature>` is appended last.
pub fn signed_query(pairs: &[(String, String)], signature: &str) -> String {
    let mut parts: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_uri_component(k), encode_uri_component(v)))
        .collect();
    parts.push(format!("sign={}", encode_uri_component(signature)));
    parts.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_sign_message_layout() {
        let msg = request_sign_message(
            "POST",
            "/v3/pay/transactions/native",
            1554208460,
            "593BEC0C930BF1AFEB40B4A08C8FB242",
            r#"{"amount":1}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            "POST\n/v3/pay/transactions/native\n1554208460\n593BEC0C930BF1AFEB40B4A08C8FB242\n{\"amount\":1}\n"
        );
    }

    #[test]
    fn test_request_sign_message_empty_body() {
        let msg = request_sign_message("GET", "/v3/certificates", 1, "n", "").unwrap();
        assert_eq!(msg, "GET\n/v3/certificates\n1\nn\n\n");
    }

    #[test]
    fn test_request_sign_message_rejects_bad_components() {
        assert!(request_sign_message("post", "/a", 1, "n", "").is_err());
        assert!(request_sign_message("GET", "https://api.example.com/a", 1, "n", "").is_err());
        assert!(request_sign_message("GET", "/a", 1, "", "").is_err());
        assert!(request_sign_message("GET", "/a", 1, "a\nb", "").is_err());
    }

    #[test]
    fn test_response_sign_message() {
        let msg = response_sign_message("1554209980", "c5ac7061fccab6bf3e254dcf98995b8c", "{}").unwrap();
        assert_eq!(msg, "1554209980\nc5ac7061fccab6bf3e254dcf98995b8c\n{}\n");
        assert!(response_sign_message("12a", "n", "").is_err());
    }

    #[test]
    fn test_header_parameters_sorted_and_quoted() {
        let header = header_parameters(
            "SCHEME",
            &[("timestamp", "1"), ("mchid", "100"), ("signature", "c2ln"), ("nonce_str", "n")],
        );
        assert_eq!(
            header,
            r#"SCHEME mchid="100",nonce_str="n",signature="c2ln",timestamp="1""#
        );
    }

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_uri_component("a+b/c"), "a%2Bb%2Fc");
        assert_eq!(encode_uri_component("中"), "%E4%B8%AD");
    }

    #[test]
    fn test_signed_query_appends_sign_last() {
        let pairs = vec![
            ("app_id".to_string(), "2021".to_string()),
            ("timestamp".to_string(), "2024-01-01 12:00:00".to_string()),
        ];
        assert_eq!(
            signed_query(&pairs, "ab+/="),
            "app_id=2021&timestamp=2024-01-01%2012%3A00%3A00&sign=ab%2B%2F%3D"
        );
    }
}
