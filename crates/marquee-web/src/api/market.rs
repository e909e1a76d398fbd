use crate::state::MarketState;
use actix_web::{get, web, HttpResponse, Responder};
use std::sync::Arc;
use tokio::sync::RwLock;

type Market = web::Data<Arc<RwLock<MarketState>>>;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Price/volume feed for one asset
///
/// ```json
/// [
///     [1491004800000, 10.5, 100],
///     [1491091200000, 11.0, 150]
/// ]
/// ```
#[utoipa::path(
    get,
    path = "/chart/{asset}",
    responses(
        (
            status = 200,
            description = "Ordered-by-time array of [timestampMillis, price, volume] tuples; both the initial and the update feed of the chart widgets"
        ),
        (status = 404, description = "Unknown asset")
    )
)]
#[get("chart/{asset}")]
pub async fn chart_feed(path: web::Path<String>, market: Market) -> impl Responder {
    let asset = path.into_inner();
    let market = market.read().await;
    match market.asset(&asset) {
        Some(book) => HttpResponse::Ok().json(&book.feed),
        None => HttpResponse::NotFound().body("unknown asset"),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Recent trades for one asset, newest first
///
/// ```json
/// [
///     {
///         "row_key": 17,
///         "confirmed": true,
///         "content": ["Mon, 03-Apr-2017 12:00:00 GMT", "Buy", "10.5000", "12", "126.0000"]
///     },
///     ...
/// ]
/// ```
#[utoipa::path(
    get,
    path = "/trades/{asset}",
    responses(
        (
            status = 200,
            description = "Keyed row snapshot for the recent-trades table; row order defines the displayed slot ranking"
        ),
        (status = 404, description = "Unknown asset")
    )
)]
#[get("trades/{asset}")]
pub async fn recent_trades(path: web::Path<String>, market: Market) -> impl Responder {
    let asset = path.into_inner();
    let market = market.read().await;
    match market.asset(&asset) {
        Some(book) => HttpResponse::Ok().json(&book.trades),
        None => HttpResponse::NotFound().body("unknown asset"),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Recent payment requests for one asset, newest first
#[utoipa::path(
    get,
    path = "/requests/{asset}",
    responses(
        (
            status = 200,
            description = "Keyed row snapshot for the recent-requests table; unconfirmed rows are served with confirmed=false and flip as the chain settles"
        ),
        (status = 404, description = "Unknown asset")
    )
)]
#[get("requests/{asset}")]
pub async fn recent_requests(path: web::Path<String>, market: Market) -> impl Responder {
    let asset = path.into_inner();
    let market = market.read().await;
    match market.asset(&asset) {
        Some(book) => HttpResponse::Ok().json(&book.requests),
        None => HttpResponse::NotFound().body("unknown asset"),
    }
}
