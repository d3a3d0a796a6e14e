//! Open API request signing and response verification.
//!
//! Requests are a flat parameter map (common parameters plus a JSON
//! `biz_content`) signed over its canonical form and sent as a
//! percent-encoded query string with `sign` last. Responses wrap the payload
//! in a `<method>_response` node; the platform signs the node's exact bytes,
//! so the node is extracted as raw JSON text and never re-serialized.

use std::collections::HashMap;

use serde_json::value::RawValue;
use serde_json::{Map, Value};

use tenantkit_primitives::canonical::canonical_pairs;
use tenantkit_primitives::message::signed_query;

use crate::certificate::resolve_serial;
use crate::context::{Algorithm, SigningContext, SIGN_FIELD, SIGN_TYPE_FIELD};
use crate::keys::{PrivateKey, PublicKey};
use crate::signing::{sign_canonical, verify, verify_canonical, SigningKey, Verification, VerifyingKey};
use crate::CryptoError;

pub const ERROR_RESPONSE_NODE: &str = "error_response";

/// Signs open API requests for one application.
#[derive(Debug, Clone)]
pub struct OpenApiSigner {
    app_id: String,
    key: SigningKey,
    context: SigningContext,
    app_cert_sn: Option<String>,
    root_cert_sn: Option<String>,
}

impl OpenApiSigner {
    /// A signer in public-key mode (no certificate serials).
    pub fn new(app_id: impl Into<String>, private_key: PrivateKey, algorithm: Algorithm) -> Self {
        Self {
            app_id: app_id.into(),
            key: SigningKey::Rsa(private_key),
            context: SigningContext::open_api_request(algorithm),
            app_cert_sn: None,
            root_cert_sn: None,
        }
    }

    /// Switch to certificate mode: every request carries `app_cert_sn` and
    /// `alipay_root_cert_sn` computed from the given PEMs.
    pub fn with_certificates(mut self, app_cert_pem: &str, root_bundle_pem: &str) -> Result<Self, CryptoError> {
        self.app_cert_sn = Some(resolve_serial(app_cert_pem, false)?);
        self.root_cert_sn = Some(resolve_serial(root_bundle_pem, true)?);
        Ok(self)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn app_cert_sn(&self) -> Option<&str> {
        self.app_cert_sn.as_deref()
    }

    pub fn root_cert_sn(&self) -> Option<&str> {
        self.root_cert_sn.as_deref()
    }

    /// Common request parameters for `method`.
    ///
    /// `timestamp` is the platform's `yyyy-MM-dd HH:mm:ss` local time string.
    pub fn common_params(&self, method: &str, timestamp: &str) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("app_id".into(), Value::from(self.app_id.as_str()));
        params.insert("method".into(), Value::from(method));
        params.insert("format".into(), Value::from("JSON"));
        params.insert("charset".into(), Value::from(self.context.charset()));
        params.insert(SIGN_TYPE_FIELD.into(), Value::from(self.context.algorithm().as_str()));
        params.insert("timestamp".into(), Value::from(timestamp));
        params.insert("version".into(), Value::from("1.0"));
        if let Some(sn) = &self.app_cert_sn {
            params.insert("app_cert_sn".into(), Value::from(sn.as_str()));
        }
        if let Some(sn) = &self.root_cert_sn {
            params.insert("alipay_root_cert_sn".into(), Value::from(sn.as_str()));
        }
        params
    }

    /// Signature over a complete parameter map.
    pub fn sign_params(&self, params: &Map<String, Value>) -> Result<String, CryptoError> {
        crate::signing::sign(&self.context, &self.key, params)
    }

    /// Build the full signed query string for a call.
    ///
    /// `biz_content` objects are embedded as compact JSON strings; `extra`
    /// parameters (`notify_url`, `app_auth_token`, ...) are merged last.
    pub fn signed_query(
        &self,
        method: &str,
        timestamp: &str,
        biz_content: &Value,
        extra: &Map<String, Value>,
    ) -> Result<String, CryptoError> {
        let mut params = self.common_params(method, timestamp);
        let biz = match biz_content {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        params.insert("biz_content".into(), Value::from(biz));
        for (k, v) in extra {
            params.insert(k.clone(), v.clone());
        }

        let pairs = canonical_pairs(&params, self.context.omit());
        if pairs.is_empty() {
            return Err(CryptoError::EmptyCanonical);
        }
        let canonical = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let signature = sign_canonical(&self.context, &self.key, canonical.trim())?;
        tracing::debug!(app_id = %self.app_id, method, "signed open API request");
        Ok(signed_query(&pairs, &signature))
    }
}

/// Name of the response node for an API method.
pub fn response_node_name(method: &str) -> String {
    format!("{}_response", method.replace('.', "_"))
}

/// Verify the `sign` of an open API response body.
///
/// The `<method>_response` node (or `error_response` when the call failed)
/// is taken verbatim from `body` and checked against the top-level `sign`.
pub fn verify_response_node(
    body: &str,
    method: &str,
    platform_key: &PublicKey,
    algorithm: Algorithm,
) -> Verification {
    match split_response(body, method) {
        Ok((node, Some(signature))) => verify_canonical(
            &SigningContext::new(algorithm),
            &VerifyingKey::Rsa(platform_key.clone()),
            node,
            &signature,
        ),
        Ok((_, None)) => {
            tracing::warn!(method, "open API response carries no sign");
            Verification::Invalid
        }
        Err(e) => {
            tracing::warn!(error = %e, method, "unreadable open API response");
            Verification::Invalid
        }
    }
}

/// Verify a response and return its payload node.
pub fn open_response(
    body: &str,
    method: &str,
    platform_key: &PublicKey,
    algorithm: Algorithm,
) -> Result<Value, CryptoError> {
    verify_response_node(body, method, platform_key, algorithm).into_result()?;
    let (node, _) = split_response(body, method)?;
    Ok(serde_json::from_str(node)?)
}

/// Verify an asynchronous notification posted as form parameters.
///
/// The algorithm comes from the notification's own `sign_type` (default
/// `RSA2`); `sign` and `sign_type` are excluded from the signed content.
pub fn verify_notification(params: &Map<String, Value>, platform_key: &PublicKey) -> Verification {
    let Some(signature) = params.get(SIGN_FIELD).and_then(Value::as_str) else {
        return Verification::Invalid;
    };
    let algorithm = match params.get(SIGN_TYPE_FIELD).and_then(Value::as_str) {
        Some(name) => match name.parse::<Algorithm>() {
            Ok(alg) if alg.is_asymmetric() => alg,
            _ => {
                tracing::warn!(sign_type = name, "unsupported notification sign_type");
                return Verification::Invalid;
            }
        },
        None => Algorithm::RsaSha256,
    };
    verify(
        &SigningContext::open_api_notify(algorithm),
        &VerifyingKey::Rsa(platform_key.clone()),
        params,
        signature,
    )
}

fn split_response<'a>(body: &'a str, method: &str) -> Result<(&'a str, Option<String>), CryptoError> {
    let nodes: HashMap<String, &'a RawValue> = serde_json::from_str(body)?;
    let node = nodes
        .get(&response_node_name(method))
        .or_else(|| nodes.get(ERROR_RESPONSE_NODE))
        .ok_or_else(|| {
            CryptoError::MalformedEnvelope(format!("no {} node", response_node_name(method)))
        })?;
    let signature = match nodes.get(SIGN_FIELD) {
        Some(raw) => Some(serde_json::from_str::<String>(raw.get())?),
        None => None,
    };
    Ok((node.get(), signature))
}
