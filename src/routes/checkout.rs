use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};

use crate::{
    dto::checkout::{CheckoutSessionCreated, CreateSessionRequest, SessionSummary, WebhookAck},
    error::AppResult,
    response::ErrorBody,
    routes::params::ApiJson,
    services::checkout_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/session/{id}", get(get_session))
}

pub fn webhook_router() -> Router<AppState> {
    Router::new().route("/webhook", post(stripe_webhook))
}

#[utoipa::path(
    post,
    path = "/api/checkout/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Hosted payment page URL", body = CheckoutSessionCreated),
        (status = 400, description = "Empty or invalid cart", body = ErrorBody),
        (status = 502, description = "Payment processor error", body = ErrorBody)
    ),
    tag = "Checkout"
)]
pub async fn create_session(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateSessionRequest>,
) -> AppResult<Json<CheckoutSessionCreated>> {
    let created = checkout_service::create_session(&state, payload).await?;
    Ok(Json(created))
}

#[utoipa::path(
    get,
    path = "/api/checkout/session/{id}",
    params(("id" = String, Path, description = "Checkout session id, `cs_` prefixed")),
    responses(
        (status = 200, description = "Session summary", body = SessionSummary),
        (status = 400, description = "Malformed session id", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 502, description = "Payment processor error", body = ErrorBody)
    ),
    tag = "Checkout"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<SessionSummary>> {
    let summary = checkout_service::get_session(&state, &id).await?;
    Ok(Json(summary))
}

/// The body is taken as raw bytes so the signature covers exactly what was sent.
#[utoipa::path(
    post,
    path = "/api/stripe/webhook",
    request_body(content = String, description = "Raw event payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Signature verification failed", body = ErrorBody)
    ),
    tag = "Checkout"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = checkout_service::handle_webhook(&state, signature, &body).await?;
    Ok(Json(ack))
}
