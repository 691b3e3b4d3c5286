use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use api::{
    api_item_processor::ApiItemProcessor,
    client::{ApiClient, reqwest_api_client::ReqwestApiClient},
};
use cache::ClientListCache;
use log::info;
use routes::AppState;
use settings::Settings;

mod api;
mod batch;
mod cache;
mod health;
mod routes;
mod settings;
mod stats;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let settings = Settings::new()?;
    let port = settings.api.port;

    let api_client: Arc<dyn ApiClient> = Arc::new(ReqwestApiClient::new(
        &settings.upstream.base_url,
        settings.upstream.request_timeout(),
    )?);
    let list_cache = Arc::new(ClientListCache::new(&settings.cache));

    let batch_runner = batch::batch_runner::start(
        Arc::new(ApiItemProcessor {
            api_client: Arc::clone(&api_client),
        }),
        Arc::clone(&list_cache),
        settings.batch.timing(),
    );
    let health = health::start(Arc::clone(&api_client), settings.health.poll_interval());

    let app_state = web::Data::new(AppState {
        api_client,
        list_cache,
        batch_runner,
        health,
        default_limit: settings.listing.default_limit,
    });

    info!(
        "Client console listening. [port = {port}, upstream = {}]",
        settings.upstream.base_url
    );

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}
