use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, COOKIE};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::cache::cache_key;
use super::types::{ContentRef, LikeStatusResponse, ToggleResponse};
use crate::config::PortalConfig;
use crate::error::ClientError;

/// The portal's like endpoints.
#[async_trait]
pub trait LikesApi: Send + Sync {
    /// One batched status query for every item.
    async fn fetch_status(&self, items: &[ContentRef]) -> Result<LikeStatusResponse, ClientError>;

    /// Flip the current user's like on one item.
    async fn toggle(&self, item: &ContentRef) -> Result<ToggleResponse, ClientError>;
}

pub struct HttpLikesApi {
    client: reqwest::Client,
    config: PortalConfig,
}

impl HttpLikesApi {
    pub fn new(config: &PortalConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        if let Some(cookie) = &config.session_cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie)
                    .map_err(|e| ClientError::Config(format!("invalid session cookie: {e}")))?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl LikesApi for HttpLikesApi {
    async fn fetch_status(&self, items: &[ContentRef]) -> Result<LikeStatusResponse, ClientError> {
        let key = cache_key(items);
        debug!("fetching like status for {} items", items.len());
        let response = self
            .client
            .get(self.config.url("/api/likes/status"))
            .query(&[("items", key.as_str())])
            .send()
            .await?;
        read_json(response).await
    }

    async fn toggle(&self, item: &ContentRef) -> Result<ToggleResponse, ClientError> {
        let path = format!(
            "/api/like/{}/{}",
            item.content_type,
            urlencoding::encode(&item.id)
        );
        debug!("toggling like on {item}");
        let response = self
            .client
            .post(self.config.url(&path))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Http {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
