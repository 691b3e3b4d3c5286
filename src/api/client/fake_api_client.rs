use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::api::model::{
    Client, ClientStatus, ClientsQuery, ClientsResponse, HealthResponse, ProcessClientResponse,
    ProcessStatus,
};

use super::{ApiClient, ApiClientError, ApiClientResult};

/// In-memory upstream used by handler and monitor tests.
#[derive(Default)]
pub struct FakeApiClient {
    pub clients: Vec<Client>,
    pub health_status: Option<String>,
    pub process_failures: HashMap<String, String>,
    pub list_calls: AtomicUsize,
    pub processed: Mutex<Vec<String>>,
}

impl FakeApiClient {
    pub fn with_clients(statuses: &[(&str, Option<ClientStatus>)]) -> Self {
        Self {
            clients: statuses
                .iter()
                .map(|(external_id, estado)| Client {
                    external_id: Some(external_id.to_string()),
                    estado: *estado,
                    ..Client::default()
                })
                .collect(),
            health_status: Some("ok".to_string()),
            ..Self::default()
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for FakeApiClient {
    async fn health(&self) -> ApiClientResult<HealthResponse> {
        match &self.health_status {
            Some(status) => Ok(HealthResponse {
                status: status.clone(),
            }),
            None => Err(ApiClientError::Status {
                status: 503,
                message: "HTTP 503".to_string(),
            }),
        }
    }

    async fn list_clients(&self, _query: &ClientsQuery) -> ApiClientResult<ClientsResponse> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        Ok(ClientsResponse {
            total: self.clients.len() as u64,
            items: self.clients.clone(),
        })
    }

    async fn get_client(&self, external_id: &str) -> ApiClientResult<Client> {
        self.clients
            .iter()
            .find(|client| client.external_id.as_deref() == Some(external_id))
            .cloned()
            .ok_or_else(|| ApiClientError::Status {
                status: 404,
                message: "Client not found".to_string(),
            })
    }

    async fn process_client(&self, external_id: &str) -> ApiClientResult<ProcessClientResponse> {
        self.processed.lock().unwrap().push(external_id.to_string());

        match self.process_failures.get(external_id) {
            Some(message) => Err(ApiClientError::Status {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(ProcessClientResponse {
                external_id: external_id.to_string(),
                service_id: None,
                status: ProcessStatus::Triggered,
                detail: None,
            }),
        }
    }
}
