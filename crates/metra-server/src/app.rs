use crate::state::AppState;
use crate::{handlers, logging, middleware as mw};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

/// Builds the HTTP application.
///
/// Layer order, outermost first: request logging → response gzip
/// (honors `Accept-Encoding`) → request gzip inflation → signature
/// verification → handlers. The signature check must run inside the
/// decompression layer so it sees the bytes the agent actually signed.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/ping", get(handlers::ping))
        .route("/update", post(handlers::update_metric))
        .route("/updates", post(handlers::update_batch))
        .route("/value", post(handlers::read_metric))
        .route("/update/{kind}/{name}/{value}", post(handlers::update_by_path))
        .route("/value/{kind}/{name}", get(handlers::value_by_path))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::verify_signature,
        ))
        .layer(RequestDecompressionLayer::new().gzip(true))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(logging::request_logging))
        .with_state(state)
}
