use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Opaque key of a client record (`external_id` upstream).
pub type Identifier = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClientStatus {
    Ok,
    Error,
    Exception,
}

impl ClientStatus {
    pub const ALL: [ClientStatus; 3] = [ClientStatus::Ok, ClientStatus::Error, ClientStatus::Exception];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Ok => "OK",
            ClientStatus::Error => "ERROR",
            ClientStatus::Exception => "EXCEPTION",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    pub external_id: Option<String>,
    pub serial: Option<String>,
    pub domicilio_to: Option<String>,
    pub velocidad_label: Option<String>,
    pub service_profile: Option<String>,
    pub es_nat: Option<u8>,
    pub phone: Option<String>,
    pub service_id: Option<String>,
    pub estado: Option<ClientStatus>,
    pub mensaje: Option<String>,
    pub fecha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientsResponse {
    pub total: u64,
    pub items: Vec<Client>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    #[serde(rename = "triggered")]
    Triggered,
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessClientResponse {
    pub external_id: String,
    #[serde(default)]
    pub service_id: Option<String>,
    pub status: ProcessStatus,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientOrder {
    #[default]
    FechaDesc,
    FechaAsc,
    ExternalIdAsc,
    ExternalIdDesc,
}

/// Filter and pagination parameters of `GET /clients`, in upstream wire shape.
///
/// `estado` is a comma separated status set. Absent fields are left out of the
/// query string entirely.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientsQuery {
    pub estado: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order: Option<ClientOrder>,
}

impl ClientsQuery {
    pub fn first_page(limit: u32) -> Self {
        Self {
            estado: None,
            search: None,
            limit: Some(limit),
            offset: Some(0),
            order: Some(ClientOrder::default()),
        }
    }

    /// Rebuilds a query received from the dashboard into its canonical form, so
    /// equivalent filters share one cache entry.
    pub fn canonical(raw: ClientsQuery, default_limit: u32) -> Self {
        let mut query = Self::first_page(default_limit);

        for status in raw.statuses() {
            query.toggle_status(status, true);
        }
        query.set_search(raw.search.as_deref().unwrap_or_default());
        if let Some(limit) = raw.limit {
            query.set_page_size(limit);
        }
        if raw.offset.is_some() {
            query.offset = raw.offset;
        }
        if raw.order.is_some() {
            query.order = raw.order;
        }

        query
    }

    /// Statuses in `estado`, unknown tokens ignored.
    pub fn statuses(&self) -> Vec<ClientStatus> {
        self.estado
            .as_deref()
            .map(|estado| estado.split(',').filter_map(ClientStatus::parse).collect())
            .unwrap_or_default()
    }

    pub fn toggle_status(&mut self, status: ClientStatus, enabled: bool) {
        let current = self.statuses();
        let selected: Vec<&str> = ClientStatus::ALL
            .into_iter()
            .filter(|candidate| {
                if *candidate == status {
                    enabled
                } else {
                    current.contains(candidate)
                }
            })
            .map(|candidate| candidate.as_str())
            .collect();

        self.estado = (!selected.is_empty()).then(|| selected.join(","));
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = (!search.is_empty()).then(|| search.to_string());
    }

    /// Changing the page size always goes back to the first page.
    pub fn set_page_size(&mut self, limit: u32) {
        self.limit = Some(limit);
        self.offset = Some(0);
    }
}
