use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::promos::{PromoValidated, ValidatePromoRequest},
    error::AppResult,
    response::ErrorBody,
    routes::params::ApiJson,
    services::promo_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_promo))
}

#[utoipa::path(
    post,
    path = "/api/promos/validate",
    request_body = ValidatePromoRequest,
    responses(
        (status = 200, description = "Promo applies", body = PromoValidated),
        (status = 400, description = "Promo rejected, reason in message", body = ErrorBody)
    ),
    tag = "Promos"
)]
pub async fn validate_promo(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ValidatePromoRequest>,
) -> AppResult<Json<PromoValidated>> {
    let validated = promo_service::validate_promo(&state.promos, payload)?;
    Ok(Json(validated))
}
