//! HTTP transport returning parsed JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde_json::Value;

use crate::config::TokenSettings;
use crate::error::TokenError;

/// JSON-over-HTTP calls used by token providers and API wrappers.
///
/// Implementations fail on non-2xx statuses and return [`Value::Null`] for
/// an empty body, which providers treat as "no response".
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET url`, parsed as JSON.
    async fn get(&self, url: &str) -> Result<Value, TokenError>;

    /// `POST url` with a JSON body, parsed as JSON.
    async fn post(&self, url: &str, body: &Value) -> Result<Value, TokenError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the request timeout from `settings`.
    pub fn new(settings: &TokenSettings) -> Result<Self, TokenError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(&self, url: &str, resp: Result<reqwest::Response, reqwest::Error>) -> Result<Value, TokenError> {
        let resp = resp.map_err(|e| unreachable_or(url, e))?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| unreachable_or(url, e))?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).chars().take(512).collect();
            return Err(TokenError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn unreachable_or(url: &str, err: reqwest::Error) -> TokenError {
    if err.is_connect() || err.is_timeout() {
        TokenError::Unreachable {
            endpoint: url.split('?').next().unwrap_or(url).to_string(),
        }
    } else {
        // The query string carries secrets such as `corpsecret`.
        TokenError::Http(err.without_url())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Value, TokenError> {
        let resp = self.client.get(url).send().await;
        self.read(url, resp).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, TokenError> {
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?)
            .send()
            .await;
        self.read(url, resp).await
    }
}

/// Join `base` and `path` and append percent-encoded query parameters.
pub fn endpoint_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<String, TokenError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let url = if query.is_empty() {
        Url::parse(&joined)
    } else {
        Url::parse_with_params(&joined, query)
    }
    .map_err(|e| TokenError::Config(format!("invalid endpoint {joined}: {e}")))?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("https://qyapi.weixin.qq.com/", "/cgi-bin/gettoken", &[("corpid", "ww1"), ("corpsecret", "a b&c")]).unwrap(),
            "https://qyapi.weixin.qq.com/cgi-bin/gettoken?corpid=ww1&corpsecret=a+b%26c"
        );
        assert_eq!(
            endpoint_url("http://127.0.0.1:8080", "cgi-bin/service/get_provider_token", &[]).unwrap(),
            "http://127.0.0.1:8080/cgi-bin/service/get_provider_token"
        );
        assert!(matches!(
            endpoint_url("not a url", "/x", &[]),
            Err(TokenError::Config(_))
        ));
    }
}
