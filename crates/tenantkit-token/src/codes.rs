//! Per-platform response code tables.

use serde_json::Value;

use crate::error::TokenError;

/// How a platform reports errors in its JSON responses.
///
/// The retry wrapper and the token providers are platform-agnostic; they
/// read codes and messages through this description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCodes {
    /// Field holding the numeric error code (`0` or absent means success).
    pub code_field: &'static str,
    /// Field holding the platform's error message.
    pub message_field: &'static str,
    /// Codes meaning "the access credential is invalid or expired".
    pub invalidation: &'static [i64],
    /// Code a corp-token issuance returns when the suite token is stale.
    pub suite_token_expired: Option<i64>,
    /// Known codes and their descriptions.
    pub messages: &'static [(i64, &'static str)],
}

impl ResponseCodes {
    /// Enterprise messaging platform (`errcode` / `errmsg`).
    pub const WECOM: ResponseCodes = ResponseCodes {
        code_field: "errcode",
        message_field: "errmsg",
        invalidation: &[40001, 40014, 42001, 40082],
        suite_token_expired: Some(42009),
        messages: WECOM_MESSAGES,
    };

    /// Error code of a response; absent, null or unparsable codes are `0`.
    pub fn code_of(&self, response: &Value) -> i64 {
        match response.get(self.code_field) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        }
    }

    /// The platform's own message, if any.
    pub fn message_of(&self, response: &Value) -> Option<String> {
        response
            .get(self.message_field)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Whether `code` means the credential must be refreshed.
    pub fn is_invalidation(&self, code: i64) -> bool {
        self.invalidation.contains(&code)
    }

    /// Description of a known code.
    pub fn describe(&self, code: i64) -> Option<&'static str> {
        self.messages
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, message)| *message)
    }

    /// Classify an authenticated API response.
    ///
    /// - `Null` (no response) becomes [`TokenError::Unreachable`];
    /// - an invalidation code becomes [`TokenError::CredentialInvalidated`];
    /// - any other non-zero code becomes [`TokenError::Business`] carrying
    ///   the table message, falling back to the platform's message;
    /// - success returns the response with code and message stripped.
    pub fn check(&self, endpoint: &str, response: Value) -> Result<Value, TokenError> {
        if response.is_null() {
            return Err(TokenError::Unreachable {
                endpoint: endpoint.to_string(),
            });
        }
        let code = self.code_of(&response);
        if code == 0 {
            return Ok(self.strip(response));
        }
        let platform_message = self.message_of(&response).unwrap_or_default();
        if self.is_invalidation(code) {
            return Err(TokenError::CredentialInvalidated {
                code,
                message: platform_message,
            });
        }
        Err(self.business(code, platform_message))
    }

    /// Build a business error for `code`, preferring the table message.
    pub fn business(&self, code: i64, platform_message: String) -> TokenError {
        let message = self
            .describe(code)
            .map(str::to_string)
            .unwrap_or(platform_message);
        TokenError::Business { code, message }
    }

    /// Remove the code and message fields from a successful response.
    pub fn strip(&self, mut response: Value) -> Value {
        if let Some(map) = response.as_object_mut() {
            map.remove(self.code_field);
            map.remove(self.message_field);
        }
        response
    }
}

const WECOM_MESSAGES: &[(i64, &str)] = &[
    (-1, "system busy, retry later"),
    (40001, "invalid secret"),
    (40003, "invalid user id"),
    (40013, "invalid corp id"),
    (40014, "invalid access_token"),
    (40054, "invalid menu url"),
    (40056, "invalid agent id"),
    (40082, "invalid suite_token"),
    (40083, "invalid suite_id"),
    (40084, "invalid permanent_code"),
    (40085, "invalid suite_ticket"),
    (40086, "invalid third-party app corp id"),
    (41001, "missing access_token"),
    (41004, "missing secret"),
    (41022, "missing suite_access_token"),
    (41023, "missing suite_ticket"),
    (41025, "missing permanent_code"),
    (42001, "access_token expired"),
    (42009, "suite_access_token expired"),
    (45009, "API call frequency limit exceeded"),
    (45033, "too many concurrent calls"),
    (48002, "API forbidden for this application"),
    (60011, "no privilege to access the member, department or tag"),
    (60020, "client IP not in the trusted list"),
    (60111, "user id not found"),
    (84014, "suite not authorized by the corp"),
    (301002, "no privilege for this corp"),
];
