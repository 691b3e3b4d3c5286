pub mod batch_runner;
pub mod outcome;
pub mod run_state;

use async_trait::async_trait;

/// Remote single-item operation driven by the batch runner.
#[async_trait]
pub trait ItemProcessor: Send + Sync + 'static {
    async fn process_one(&self, identifier: &str) -> anyhow::Result<()>;
}

/// Receives the staleness signal once a batch has finished.
#[async_trait]
pub trait ListInvalidator: Send + Sync + 'static {
    async fn invalidate_list_cache(&self);
}
