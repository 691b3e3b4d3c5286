pub mod reqwest_api_client;

#[cfg(test)]
pub mod fake_api_client;

use async_trait::async_trait;
use thiserror::Error;

use super::model::{Client, ClientsQuery, ClientsResponse, HealthResponse, ProcessClientResponse};

pub type ApiClientResult<T> = Result<T, ApiClientError>;

const CONNECTION_ERROR_MESSAGE: &str = "Connection error";

#[derive(Error, Debug)]
pub enum ApiClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream responded with HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to deserialize JSON from response: {source}\nRaw response: {raw}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("Other error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl ApiClientError {
    /// Message meant for an operator, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            ApiClientError::Status { message, .. } => message.clone(),
            ApiClientError::Request(err) => {
                let message = err.to_string();
                if message.trim().is_empty() {
                    CONNECTION_ERROR_MESSAGE.to_string()
                } else {
                    message
                }
            }
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    async fn health(&self) -> ApiClientResult<HealthResponse>;

    async fn list_clients(&self, query: &ClientsQuery) -> ApiClientResult<ClientsResponse>;

    async fn get_client(&self, external_id: &str) -> ApiClientResult<Client>;

    async fn process_client(&self, external_id: &str) -> ApiClientResult<ProcessClientResponse>;
}
