use serde::Serialize;

use crate::api::model::{Client, ClientStatus};

/// Status counters over one page of clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub ok: usize,
    pub error: usize,
    pub exception: usize,
    pub success_rate: u8,
}

impl ClientStats {
    pub fn from_clients(clients: &[Client]) -> Self {
        let count = |status: ClientStatus| {
            clients
                .iter()
                .filter(|client| client.estado == Some(status))
                .count()
        };

        let ok = count(ClientStatus::Ok);
        let error = count(ClientStatus::Error);
        let exception = count(ClientStatus::Exception);
        let total = ok + error + exception;

        // Clients without a status are left out of the rate.
        let success_rate = if total == 0 {
            0
        } else {
            ((200 * ok + total) / (2 * total)) as u8
        };

        Self {
            ok,
            error,
            exception,
            success_rate,
        }
    }
}
