use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::{info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::api::client::ApiClient;

/// `tokio::time::interval` panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthState {
    pub online: bool,
    pub last_checked_at: Option<u64>,
    pub last_error: Option<String>,
}

#[derive(Clone)]
pub struct HealthMonitorHandle {
    state: watch::Receiver<HealthState>,
}

impl HealthMonitorHandle {
    pub fn current(&self) -> HealthState {
        self.state.borrow().clone()
    }
}

pub async fn check(api_client: &dyn ApiClient) -> HealthState {
    let last_checked_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|elapsed| elapsed.as_secs());

    match api_client.health().await {
        Ok(health) if health.is_ok() => HealthState {
            online: true,
            last_checked_at,
            last_error: None,
        },
        Ok(health) => HealthState {
            online: false,
            last_checked_at,
            last_error: Some(format!("Unexpected health status: {}", health.status)),
        },
        Err(err) => HealthState {
            online: false,
            last_checked_at,
            last_error: Some(err.message()),
        },
    }
}

/// Polls upstream health in the background. The first check runs immediately.
pub fn start(api_client: Arc<dyn ApiClient>, poll_interval: Duration) -> HealthMonitorHandle {
    let (sender, state) = watch::channel(HealthState::default());
    if poll_interval < MIN_POLL_INTERVAL {
        warn!("Health poll interval too small, using {MIN_POLL_INTERVAL:?}. [poll_interval = {poll_interval:?}]");
    }
    let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);

        loop {
            interval.tick().await;

            let health = check(api_client.as_ref()).await;
            let was_online = sender.borrow().online;
            if health.online != was_online {
                if health.online {
                    info!("Upstream API is online.");
                } else {
                    warn!(
                        "Upstream API is offline. [error = {}]",
                        health.last_error.as_deref().unwrap_or_default()
                    );
                }
            }

            if sender.send(health).is_err() {
                info!("All health observers were dropped, stopping health monitor.");
                break;
            }
        }
    });

    HealthMonitorHandle { state }
}
