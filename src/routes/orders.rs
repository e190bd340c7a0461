use axum::{Json, Router, extract::State, middleware, routing::post};

use crate::{
    dto::orders::CreateOrderRequest,
    error::AppResult,
    middleware::rate_limit::limit_orders,
    response::{ErrorBody, OrderAck},
    routes::params::ApiJson,
    services::order_service,
    state::AppState,
};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route_layer(middleware::from_fn_with_state(state, limit_orders))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order accepted and sales notified", body = OrderAck),
        (status = 400, description = "Validation failure", body = ErrorBody),
        (status = 429, description = "Too many orders from this IP", body = ErrorBody),
        (status = 500, description = "Notification failed", body = ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> AppResult<Json<OrderAck>> {
    let ack = order_service::create_order(&state, payload).await?;
    Ok(Json(ack))
}
