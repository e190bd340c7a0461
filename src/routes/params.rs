use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct ProductQuery {
    /// Case-insensitive category label, e.g. `Premium` or `Kit`.
    pub category: Option<String>,
    pub featured: Option<bool>,
}

/// `Json` whose rejection is rendered as the standard error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request body");
                Err(AppError::BadRequest(match rejection {
                    JsonRejection::MissingJsonContentType(_) => {
                        "Expected a JSON request body".to_string()
                    }
                    _ => "Malformed JSON request body".to_string(),
                }))
            }
        }
    }
}
