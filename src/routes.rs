use std::sync::Arc;

use actix_web::{
    HttpResponse, get, post,
    web::{self, Data, Json, Path, Query},
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        client::{ApiClient, ApiClientError},
        model::{Client, ClientsQuery, Identifier},
    },
    batch::{
        batch_runner::{BatchRunnerHandle, StartRejected},
        outcome::{BatchSummary, Outcome},
        run_state::{RunPhase, RunState},
    },
    cache::ClientListCache,
    health::HealthMonitorHandle,
    stats::ClientStats,
};

pub struct AppState {
    pub api_client: Arc<dyn ApiClient>,
    pub list_cache: Arc<ClientListCache>,
    pub batch_runner: BatchRunnerHandle,
    pub health: HealthMonitorHandle,
    pub default_limit: u32,
}

#[derive(Debug, Serialize)]
struct ClientListView {
    total: u64,
    items: Vec<Client>,
    stats: ClientStats,
}

#[derive(Debug, Deserialize)]
struct StartBatchRequest {
    identifiers: Vec<Identifier>,
    /// Hold the response until every item has an outcome.
    #[serde(default)]
    wait: bool,
}

#[derive(Debug, Serialize)]
struct BatchAccepted {
    run_id: Uuid,
    total_count: usize,
}

#[derive(Debug, Serialize)]
struct BatchStatusView {
    run_id: Option<Uuid>,
    phase: RunPhase,
    is_running: bool,
    selection: Vec<Identifier>,
    completed_count: usize,
    total_count: usize,
    progress_percent: u8,
    outcomes: Vec<Outcome>,
    summary: Option<BatchSummary>,
}

impl From<RunState> for BatchStatusView {
    fn from(state: RunState) -> Self {
        Self {
            is_running: state.is_running(),
            progress_percent: state.progress_percent(),
            run_id: state.run_id,
            phase: state.phase,
            selection: state.selection,
            completed_count: state.completed_count,
            total_count: state.total_count,
            outcomes: state.outcomes,
            summary: state.summary,
        }
    }
}

fn upstream_error(err: ApiClientError) -> actix_web::Error {
    match err.status() {
        Some(404) => actix_web::error::ErrorNotFound(err.message()),
        _ => {
            error!("Upstream call failed. [error = {err}]");
            actix_web::error::ErrorBadGateway(err.message())
        }
    }
}

#[get("/health")]
async fn health_status(state: Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.health.current())
}

#[get("/clients")]
async fn list_clients(
    state: Data<AppState>,
    query: Query<ClientsQuery>,
) -> actix_web::Result<HttpResponse> {
    let query = ClientsQuery::canonical(query.into_inner(), state.default_limit);

    let response = state
        .list_cache
        .get_or_fetch(&query, || state.api_client.list_clients(&query))
        .await
        .map_err(upstream_error)?;

    Ok(HttpResponse::Ok().json(ClientListView {
        total: response.total,
        stats: ClientStats::from_clients(&response.items),
        items: response.items,
    }))
}

#[get("/clients/{external_id}")]
async fn get_client(
    state: Data<AppState>,
    external_id: Path<String>,
) -> actix_web::Result<HttpResponse> {
    let client = state
        .api_client
        .get_client(&external_id)
        .await
        .map_err(upstream_error)?;

    Ok(HttpResponse::Ok().json(client))
}

#[post("/clients/{external_id}/process")]
async fn process_client(
    state: Data<AppState>,
    external_id: Path<String>,
) -> actix_web::Result<HttpResponse> {
    let response = state
        .api_client
        .process_client(&external_id)
        .await
        .map_err(upstream_error)?;

    state.list_cache.invalidate_all();

    Ok(HttpResponse::Ok().json(response))
}

#[post("/batch")]
async fn start_batch(
    state: Data<AppState>,
    request: Json<StartBatchRequest>,
) -> actix_web::Result<HttpResponse> {
    let StartBatchRequest { identifiers, wait } = request.into_inner();

    let ticket = match state.batch_runner.start(identifiers).await {
        Ok(ticket) => ticket,
        Err(StartRejected::EmptySelection) => {
            return Ok(HttpResponse::UnprocessableEntity().body(StartRejected::EmptySelection.to_string()));
        }
        Err(rejected @ StartRejected::AlreadyRunning(_)) => {
            return Ok(HttpResponse::Conflict().body(rejected.to_string()));
        }
        Err(rejected @ StartRejected::RunnerGone) => {
            return Ok(HttpResponse::ServiceUnavailable().body(rejected.to_string()));
        }
    };

    info!(
        "Batch accepted. [run_id = {}, total_count = {}]",
        ticket.run_id, ticket.total_count
    );

    if !wait {
        return Ok(HttpResponse::Accepted().json(BatchAccepted {
            run_id: ticket.run_id,
            total_count: ticket.total_count,
        }));
    }

    let report = ticket
        .completed()
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(report))
}

#[get("/batch")]
async fn batch_status(state: Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(BatchStatusView::from(state.batch_runner.snapshot()))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_status)
        .service(list_clients)
        .service(get_client)
        .service(process_client)
        .service(start_batch)
        .service(batch_status);
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    use crate::{
        api::{api_item_processor::ApiItemProcessor, client::fake_api_client::FakeApiClient, model::ClientStatus},
        batch::batch_runner::{self, BatchTiming},
        health,
        settings::CacheSettings,
    };

    use super::*;

    fn app_state(api_client: Arc<FakeApiClient>) -> Data<AppState> {
        let api_client: Arc<dyn ApiClient> = api_client;
        let list_cache = Arc::new(ClientListCache::new(&CacheSettings {
            ttl_secs: 60,
            max_entries: 16,
        }));
        let batch_runner = batch_runner::start(
            Arc::new(ApiItemProcessor {
                api_client: Arc::clone(&api_client),
            }),
            Arc::clone(&list_cache),
            BatchTiming {
                pacing_delay: Duration::from_millis(1),
                settle_delay: Duration::from_secs(60),
            },
        );
        let health = health::start(Arc::clone(&api_client), Duration::from_secs(60));

        Data::new(AppState {
            api_client,
            list_cache,
            batch_runner,
            health,
            default_limit: 25,
        })
    }

    fn upstream() -> Arc<FakeApiClient> {
        Arc::new(FakeApiClient::with_clients(&[
            ("C-1", Some(ClientStatus::Ok)),
            ("C-2", Some(ClientStatus::Error)),
            ("C-3", Some(ClientStatus::Ok)),
        ]))
    }

    #[actix_web::test]
    async fn given_list_request__when_repeated__should_serve_cached_page_with_stats() {
        let api_client = upstream();
        let app =
            test::init_service(App::new().app_data(app_state(api_client.clone())).configure(configure))
                .await;

        for _ in 0..2 {
            let request = test::TestRequest::get()
                .uri("/clients?estado=OK,ERROR&limit=25")
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, request).await;

            assert_eq!(body["total"], 3);
            assert_eq!(body["stats"]["ok"], 2);
            assert_eq!(body["stats"]["success_rate"], 67);
        }

        assert_eq!(api_client.list_calls(), 1);
    }

    #[actix_web::test]
    async fn given_single_process__when_triggered__should_invalidate_cached_lists() {
        let api_client = upstream();
        let app =
            test::init_service(App::new().app_data(app_state(api_client.clone())).configure(configure))
                .await;

        test::call_service(&app, test::TestRequest::get().uri("/clients").to_request()).await;
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/clients/C-2/process").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        test::call_service(&app, test::TestRequest::get().uri("/clients").to_request()).await;

        assert_eq!(api_client.list_calls(), 2);
    }

    #[actix_web::test]
    async fn given_unknown_client__when_fetched__should_respond_not_found() {
        let app = test::init_service(App::new().app_data(app_state(upstream())).configure(configure)).await;

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/clients/C-404").to_request())
                .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn given_empty_selection__when_batch_started__should_reject_and_stay_idle() {
        let app = test::init_service(App::new().app_data(app_state(upstream())).configure(configure)).await;

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/batch")
                .set_json(json!({"identifiers": []}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let status: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/batch").to_request())
                .await;
        assert_eq!(status["phase"], "idle");
        assert_eq!(status["total_count"], 0);
    }

    #[actix_web::test]
    async fn given_waiting_batch__when_one_item_fails__should_report_partial_failure() {
        let api_client = Arc::new(FakeApiClient {
            process_failures: HashMap::from([("B".to_string(), "timeout".to_string())]),
            ..FakeApiClient::default()
        });
        let app =
            test::init_service(App::new().app_data(app_state(api_client.clone())).configure(configure))
                .await;

        let report: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/batch")
                .set_json(json!({"identifiers": ["A", "B", "C"], "wait": true}))
                .to_request(),
        )
        .await;

        assert_eq!(report["summary"], json!({"succeeded": 2, "failed": 1}));
        assert_eq!(
            report["outcomes"][1],
            json!({"identifier": "B", "succeeded": false, "error_message": "timeout"})
        );
        assert_eq!(api_client.processed(), vec!["A", "B", "C"]);

        let status: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/batch").to_request())
                .await;
        assert_eq!(status["phase"], "settling");
        assert_eq!(status["progress_percent"], 100);
        assert_eq!(status["is_running"], false);
    }

    #[actix_web::test]
    async fn given_running_batch__when_started_again__should_conflict() {
        let app = test::init_service(App::new().app_data(app_state(upstream())).configure(configure)).await;
        let identifiers: Vec<String> = (0..50).map(|i| format!("C-{i}")).collect();

        let first = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/batch")
                .set_json(json!({"identifiers": identifiers}))
                .to_request(),
        )
        .await;
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/batch")
                .set_json(json!({"identifiers": ["X"]}))
                .to_request(),
        )
        .await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }
}
