use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::{dotenv, var};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod state;

use state::MarketState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    std::env::set_var("RUST_LOG", "actix_web=debug");
    dotenv().ok();
    env_logger::init();

    // seed the simulated market from .env MARQUEE_ASSETS
    let assets: Vec<String> = var("MARQUEE_ASSETS")
        .unwrap_or_else(|_| "BTC,LTC".to_string())
        .split(',')
        .map(|name| name.trim().to_string())
        .collect();
    log::info!("Simulating assets: {assets:?}");
    let market_state = Arc::new(RwLock::new(MarketState::seed(&assets)));

    // advance the simulation on a timer so the polling widgets have
    // something to animate
    let step_secs: u64 = var("MARQUEE_STEP_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    let drift = market_state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(step_secs));
        loop {
            ticker.tick().await;
            drift.write().await.advance();
        }
    });

    // create API documentation
    use api::*;
    #[derive(OpenApi)]
    #[openapi(paths(
        market::chart_feed,
        market::recent_trades,
        market::recent_requests
    ))]
    struct ApiDoc;
    let openapi = ApiDoc::openapi();

    // run server
    let bind = var("MARQUEE_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(market_state.clone()))
            // api endpoints
            .service(market::chart_feed)
            .service(market::recent_trades)
            .service(market::recent_requests)
            // api documentation
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/openapi.json", openapi.clone()))
    })
    .bind(bind)?
    .run()
    .await
}
