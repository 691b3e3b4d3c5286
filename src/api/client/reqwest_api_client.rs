use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use log::debug;
use reqwest::{RequestBuilder, StatusCode, Url, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::api::model::{
    Client, ClientsQuery, ClientsResponse, HealthResponse, ProcessClientResponse,
};

use super::{ApiClient, ApiClientError, ApiClientResult};

pub struct ReqwestApiClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            bail!("Upstream url cannot be used as a base. [url = {base_url}]");
        }

        Ok(Self {
            base_url,
            client: reqwest::Client::builder().timeout(request_timeout).build()?,
        })
    }

    /// Appends path segments to the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ApiClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Upstream url cannot be used as a base. [url = {}]", self.base_url))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiClientResult<T> {
        let response = request
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiClientError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        match serde_json::from_str::<T>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ApiClientError::Deserialize {
                source: e,
                raw: body,
            }),
        }
    }
}

/// Picks the most specific description out of an error response: `detail`,
/// then `message` for JSON bodies, otherwise the raw text.
fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = format!("HTTP {}", status.as_u16());

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return ["detail", "message"]
            .into_iter()
            .filter_map(|key| value.get(key))
            .find_map(|field| match field {
                serde_json::Value::Null => None,
                serde_json::Value::String(text) if text.is_empty() => None,
                serde_json::Value::String(text) => Some(text.clone()),
                other => Some(other.to_string()),
            })
            .unwrap_or(fallback);
    }

    if body.trim().is_empty() {
        fallback
    } else {
        body.to_string()
    }
}

#[async_trait]
impl ApiClient for ReqwestApiClient {
    async fn health(&self) -> ApiClientResult<HealthResponse> {
        let url = self.endpoint(&["health"])?;
        self.send(self.client.get(url)).await
    }

    async fn list_clients(&self, query: &ClientsQuery) -> ApiClientResult<ClientsResponse> {
        let url = self.endpoint(&["clients"])?;
        debug!("Listing clients. [query = {query:?}]");

        self.send(self.client.get(url).query(query)).await
    }

    async fn get_client(&self, external_id: &str) -> ApiClientResult<Client> {
        let url = self.endpoint(&["clients", external_id])?;
        self.send(self.client.get(url)).await
    }

    async fn process_client(&self, external_id: &str) -> ApiClientResult<ProcessClientResponse> {
        let url = self.endpoint(&["clients", external_id])?;
        debug!("Triggering processing. [external_id = {external_id}]");

        self.send(self.client.post(url)).await
    }
}
