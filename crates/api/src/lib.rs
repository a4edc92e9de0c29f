//! HTTP API server with observability for the bookstore ordering service.
//!
//! Exposes the order workflow, the book catalog and revenue reports as REST
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{books, ops, orders, reports};

    let metrics_router = Router::new()
        .route("/metrics", get(ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(ops::check::<S>))
        .route("/books", get(books::list::<S>).post(books::create::<S>))
        .route(
            "/books/{id}",
            get(books::get::<S>)
                .put(books::update::<S>)
                .delete(books::delete::<S>),
        )
        .route("/orders", get(orders::list::<S>).post(orders::create::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>)
                .put(orders::update::<S>)
                .delete(orders::delete::<S>),
        )
        .route("/orders/{id}/confirm", post(orders::confirm::<S>))
        .route("/reports/revenue", get(reports::revenue::<S>))
        .route_layer(middleware::from_fn(ops::track_requests))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
