//! Base HTTP client with shared logic

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::config::provider::is_real_credential;
use crate::domain::LlmProvider;
use crate::infrastructure::model::types::ModelError;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Base HTTP client with shared functionality
#[derive(Clone)]
pub struct HttpClientBase {
    pub provider: LlmProvider,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Self {
        Self {
            provider: config.provider,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout,
            http: Client::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(is_real_credential)
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Post JSON with bearer auth
    pub async fn post_with_bearer<Req, Res>(&self, url: &str, body: &Req) -> Result<Res, ModelError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let api_key = self.require_api_key()?;
        let request = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(body);
        self.send(request).await
    }

    /// Post JSON with the key in a named header
    pub async fn post_with_header<Req, Res>(
        &self,
        url: &str,
        header: &str,
        extra: &[(&str, &str)],
        body: &Req,
    ) -> Result<Res, ModelError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let api_key = self.require_api_key()?;
        let mut request = self.http.post(url).header(header, api_key).json(body);
        for (name, value) in extra {
            request = request.header(*name, *value);
        }
        self.send(request).await
    }

    /// Post JSON with query param auth (for Gemini)
    pub async fn post_with_query_key<Req, Res>(
        &self,
        url: &str,
        body: &Req,
    ) -> Result<Res, ModelError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let api_key = self.require_api_key()?;
        let request = self.http.post(url).query(&[("key", api_key)]).json(body);
        self.send(request).await
    }

    async fn send<Res>(&self, request: RequestBuilder) -> Result<Res, ModelError>
    where
        Res: DeserializeOwned,
    {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ModelError::network(self.provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                provider: self.provider,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(self.provider, e.to_string()))
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|key| is_real_credential(key))
            .ok_or(ModelError::NotConfigured {
                provider: self.provider,
            })
    }
}
