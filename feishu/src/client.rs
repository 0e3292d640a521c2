use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::post;

const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";

/// HTTP timeout for Feishu API calls, unrelated to token lifetime.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Safety margin subtracted from the reported token lifetime so a token
/// is refreshed slightly before Feishu stops accepting it.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum FeishuError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Feishu API error: {msg} (code={code})")]
    Api { code: i64, msg: String },

    #[error("receive_id is required (configure a default chat id or pass one explicitly)")]
    MissingReceiveId,
}

pub type FeishuResult<T> = Result<T, FeishuError>;

/// In-memory tenant token cache. Only reset when the process restarts
/// or the cached entry passes its (margin-shortened) expiry.
#[derive(Debug, Clone)]
struct TokenCache {
    token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenCache {
    fn new() -> Self {
        Self {
            token: None,
            expires_at: None,
        }
    }

    fn valid_token(&self) -> Option<&str> {
        match (&self.token, self.expires_at) {
            (Some(token), Some(expires_at)) if Instant::now() < expires_at => Some(token),
            _ => None,
        }
    }

    fn set(&mut self, token: String, lifetime: Duration) {
        self.token = Some(token);
        self.expires_at = Some(Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN));
    }
}

#[derive(Debug, Deserialize)]
struct TenantTokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: Option<String>,
    #[serde(default)]
    expire: Option<u64>,
}

/// Feishu Open API client.
///
/// Cheap to clone; the token cache is shared between clones.
#[derive(Clone)]
pub struct FeishuClient {
    http: Client,
    base_url: String,
    app_id: String,
    app_secret: String,
    default_receive_id: Option<String>,
    token_cache: Arc<RwLock<TokenCache>>,
}

impl FeishuClient {
    pub fn new(app_id: String, app_secret: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id,
            app_secret,
            default_receive_id: None,
            token_cache: Arc::new(RwLock::new(TokenCache::new())),
        }
    }

    /// Override the API base URL (used by tests against a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Default chat to deliver to when callers do not pass a receive id.
    pub fn with_default_receive_id(mut self, receive_id: impl Into<String>) -> Self {
        self.default_receive_id = Some(receive_id.into());
        self
    }

    /// Fetch a tenant access token, serving from the cache while it is
    /// still valid.
    pub async fn tenant_access_token(&self) -> FeishuResult<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(token) = cache.valid_token() {
                debug!("tenant_access_token served from cache");
                return Ok(token.to_string());
            }
        }

        let url = format!(
            "{}/open-apis/auth/v3/tenant_access_token/internal",
            self.base_url
        );
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "app_id": self.app_id,
                "app_secret": self.app_secret,
            }))
            .send()
            .await
            .map_err(|e| {
                FeishuError::Network(format!("requesting tenant_access_token: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeishuError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: TenantTokenResponse = response
            .json()
            .await
            .map_err(|e| FeishuError::Network(format!("decoding token response: {}", e)))?;

        if data.code != 0 {
            return Err(FeishuError::Api {
                code: data.code,
                msg: data.msg,
            });
        }

        let token = data.tenant_access_token.ok_or_else(|| FeishuError::Api {
            code: data.code,
            msg: "token response missing tenant_access_token".to_string(),
        })?;
        let lifetime = Duration::from_secs(data.expire.unwrap_or(0));

        {
            let mut cache = self.token_cache.write().await;
            cache.set(token.clone(), lifetime);
        }
        info!("tenant_access_token refreshed (expires in {:?})", lifetime);

        Ok(token)
    }

    fn resolve_receive_id<'a>(&'a self, receive_id: Option<&'a str>) -> FeishuResult<&'a str> {
        receive_id
            .or(self.default_receive_id.as_deref())
            .ok_or(FeishuError::MissingReceiveId)
    }

    /// Send a plain text message.
    pub async fn send_text(
        &self,
        text: &str,
        receive_id: Option<&str>,
        receive_id_type: &str,
    ) -> FeishuResult<()> {
        let content = json!({ "text": text }).to_string();
        self.send_message("text", content, receive_id, receive_id_type)
            .await
    }

    /// Send a rich-text ("post") message. `zh_cn` is the locale block:
    /// `{"title": "...", "content": [[{"tag": "text", ...}], ...]}`.
    pub async fn send_post(
        &self,
        zh_cn: &Value,
        receive_id: Option<&str>,
        receive_id_type: &str,
    ) -> FeishuResult<()> {
        // Feishu requires the content field to be stringified JSON with
        // the locale as the outer key.
        let content = json!({ "zh_cn": zh_cn }).to_string();
        self.send_message("post", content, receive_id, receive_id_type)
            .await
    }

    /// Parse a frontend-generated summary text and deliver it as a
    /// rich-text post.
    pub async fn send_post_from_summary_text(
        &self,
        summary_text: &str,
        title: &str,
        receive_id: Option<&str>,
        receive_id_type: &str,
    ) -> FeishuResult<()> {
        let sections = post::parse_sections(summary_text);
        let zh_cn = post::build_post_from_sections(title, &sections);
        self.send_post(&zh_cn, receive_id, receive_id_type).await
    }

    async fn send_message(
        &self,
        msg_type: &str,
        content: String,
        receive_id: Option<&str>,
        receive_id_type: &str,
    ) -> FeishuResult<()> {
        let target_id = self.resolve_receive_id(receive_id)?;
        let token = self.tenant_access_token().await?;

        let url = format!("{}/open-apis/im/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .query(&[("receive_id_type", receive_id_type)])
            .json(&json!({
                "receive_id": target_id,
                "msg_type": msg_type,
                "content": content,
            }))
            .send()
            .await
            .map_err(|e| FeishuError::Network(format!("sending {} message: {}", msg_type, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeishuError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| FeishuError::Network(format!("decoding message response: {}", e)))?;

        let code = data.get("code").and_then(Value::as_i64).unwrap_or(-1);
        if code != 0 {
            let msg = data
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(FeishuError::Api { code, msg });
        }

        debug!("{} message delivered to {}", msg_type, target_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> FeishuClient {
        FeishuClient::new("app".into(), "secret".into()).with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn caches_tenant_token_between_calls() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/open-apis/auth/v3/tenant_access_token/internal");
                then.status(200).json_body(serde_json::json!({
                    "code": 0,
                    "msg": "ok",
                    "tenant_access_token": "t-abc",
                    "expire": 7200
                }));
            })
            .await;

        let client = client_for(&server);
        assert_eq!(client.tenant_access_token().await.unwrap(), "t-abc");
        assert_eq!(client.tenant_access_token().await.unwrap(), "t-abc");
        token_mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn api_error_code_surfaces_as_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/open-apis/auth/v3/tenant_access_token/internal");
                then.status(200).json_body(serde_json::json!({
                    "code": 99991663,
                    "msg": "app not found"
                }));
            })
            .await;

        let client = client_for(&server);
        match client.tenant_access_token().await {
            Err(FeishuError::Api { code, msg }) => {
                assert_eq!(code, 99991663);
                assert_eq!(msg, "app not found");
            }
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn send_text_requires_receive_id() {
        let server = MockServer::start_async().await;
        let client = client_for(&server);
        let err = client.send_text("hi", None, "chat_id").await.unwrap_err();
        assert!(matches!(err, FeishuError::MissingReceiveId));
    }

    #[tokio::test]
    async fn send_text_posts_stringified_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/open-apis/auth/v3/tenant_access_token/internal");
                then.status(200).json_body(serde_json::json!({
                    "code": 0,
                    "tenant_access_token": "t-abc",
                    "expire": 7200
                }));
            })
            .await;
        let message_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/open-apis/im/v1/messages")
                    .query_param("receive_id_type", "chat_id")
                    .json_body_partial(
                        r#"{"receive_id": "oc_123", "msg_type": "text"}"#,
                    );
                then.status(200).json_body(serde_json::json!({ "code": 0, "msg": "success" }));
            })
            .await;

        let client = client_for(&server);
        client
            .send_text("hello", Some("oc_123"), "chat_id")
            .await
            .unwrap();
        message_mock.assert_async().await;
    }
}
