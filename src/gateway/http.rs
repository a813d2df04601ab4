//! HTTP implementation of the remote gateway

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::{ChatRequest, EmotionResponse, Endpoint, RemoteCallError, RemoteGateway, ReplyResponse};
use crate::Result;

/// Talks JSON to the reply and emotion backends under one base location
#[derive(Debug, Clone)]
pub struct HttpGateway {
    /// HTTP client
    client: Client,
    /// Base location, always ending in `/`
    base_url: Url,
}

impl HttpGateway {
    /// Create a gateway for the backend at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is not a valid URL
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a gateway reusing an existing HTTP client
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is not a valid URL
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;

        // `Url::join` replaces the last segment unless the path ends in `/`
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// Base location requests are sent to
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for an endpoint
    fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(self.base_url.join(endpoint.path())?)
    }

    /// POST `{message}` to an endpoint and decode the JSON answer
    async fn exchange<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        text: &str,
    ) -> std::result::Result<T, RemoteCallError> {
        let url = self.endpoint_url(endpoint).map_err(|e| RemoteCallError::Decode {
            endpoint,
            reason: e.to_string(),
        })?;

        let request = ChatRequest {
            message: text.to_string(),
        };

        tracing::debug!(%endpoint, url = %url, "sending request");

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|source| RemoteCallError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteCallError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| RemoteCallError::Transport { endpoint, source })?;

        let parsed = serde_json::from_str(&body).map_err(|e| RemoteCallError::Decode {
            endpoint,
            reason: e.to_string(),
        })?;

        tracing::debug!(%endpoint, status = %status, "response received");
        Ok(parsed)
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn get_reply(&self, text: &str) -> std::result::Result<ReplyResponse, RemoteCallError> {
        self.exchange(Endpoint::Reply, text).await
    }

    async fn get_emotion(
        &self,
        text: &str,
    ) -> std::result::Result<EmotionResponse, RemoteCallError> {
        self.exchange(Endpoint::Emotion, text).await
    }
}
