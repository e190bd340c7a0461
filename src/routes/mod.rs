use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    config::CheckoutMode,
    error::AppError,
    state::AppState,
};

pub mod checkout;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod promos;

/// API routes for the configured checkout mode. Only one checkout path is mounted.
pub fn create_api_router(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .nest("/products", products::router())
        .nest("/promos", promos::router());

    match state.config.checkout_mode {
        CheckoutMode::Email => router.nest("/orders", orders::router(state.clone())),
        CheckoutMode::Hosted => router
            .nest("/checkout", checkout::router())
            .nest("/stripe", checkout::webhook_router()),
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router(&state))
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

async fn not_found() -> AppError {
    AppError::NotFound
}
