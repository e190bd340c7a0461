use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{mailer::MailError, payments::PaymentError, response::ErrorBody};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Too many orders from this IP, please wait.")]
    RateLimited,

    #[error("Failed to send order email")]
    Notification(#[from] MailError),

    #[error("Payment provider error")]
    Payment(#[from] PaymentError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Payment(PaymentError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Provider details stay in the log.
        match &self {
            AppError::Notification(err) => {
                tracing::error!(error = %err, "order notification failed");
            }
            AppError::Payment(PaymentError::NotFound) => {}
            AppError::Payment(err) => {
                tracing::error!(error = %err, "payment provider call failed");
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
            }
            _ => {}
        }

        let message = match &self {
            AppError::Payment(PaymentError::NotFound) => PaymentError::NotFound.to_string(),
            _ => self.to_string(),
        };

        (status, axum::Json(ErrorBody::new(message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
