use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use log::debug;

use crate::{api::client::ApiClient, batch::ItemProcessor};

/// Drives batch items through `POST /clients/{external_id}`.
pub struct ApiItemProcessor {
    pub api_client: Arc<dyn ApiClient>,
}

#[async_trait]
impl ItemProcessor for ApiItemProcessor {
    async fn process_one(&self, identifier: &str) -> anyhow::Result<()> {
        let response = self
            .api_client
            .process_client(identifier)
            .await
            .map_err(|err| anyhow!(err.message()))?;

        debug!(
            "Upstream accepted processing. [external_id = {}, status = {:?}]",
            response.external_id, response.status
        );

        Ok(())
    }
}
