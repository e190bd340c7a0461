use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::{
    client::cart::{CartStore, CartUnavailable},
    config::trim_base_url,
    dto::{
        checkout::{CheckoutSessionCreated, CreateSessionRequest, SessionItemRequest},
        orders::CreateOrderRequest,
        promos::{PromoValidated, ValidatePromoRequest},
    },
    models::{CartItem, CheckoutItem, Customer},
    money::{DEFAULT_CURRENCY, round2},
    response::OrderAck,
};

/// Long enough for a slow email relay behind the order endpoint.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("backend URL is not configured")]
    MissingBaseUrl,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error(transparent)]
    CartUnavailable(#[from] CartUnavailable),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl SubmitError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            SubmitError::Timeout(timeout)
        } else {
            SubmitError::Network(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OrderClient {
    pub fn new(base_url: Option<&str>) -> Result<Self, SubmitError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: Option<&str>, timeout: Duration) -> Result<Self, SubmitError> {
        let base_url = base_url
            .map(trim_base_url)
            .filter(|url| !url.is_empty())
            .ok_or(SubmitError::MissingBaseUrl)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SubmitError::Network)?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit the contents of `cart`. The cart itself is never cleared here.
    pub async fn submit_cart(
        &self,
        cart: Option<&CartStore>,
        customer: &Customer,
        promo_code: Option<&str>,
    ) -> Result<OrderAck, SubmitError> {
        let cart = cart.ok_or(CartUnavailable)?;
        self.submit_order(cart.items(), customer, cart.total_price(), promo_code)
            .await
    }

    pub async fn submit_order(
        &self,
        items: &[CartItem],
        customer: &Customer,
        total: f64,
        promo_code: Option<&str>,
    ) -> Result<OrderAck, SubmitError> {
        let payload = build_order_payload(items, customer, total, promo_code)?;
        let (status, body) = self.post_json("/api/orders", &payload).await?;
        let ack = interpret_response(status, &body)?;
        tracing::info!(order_id = ?ack.order_id, "order submitted");
        Ok(ack)
    }

    pub async fn validate_promo(
        &self,
        code: &str,
        total: f64,
        currency: Option<&str>,
    ) -> Result<PromoValidated, SubmitError> {
        let payload = ValidatePromoRequest {
            code: Some(code.trim().to_string()),
            total: Some(round2(total)),
            currency: Some(currency.unwrap_or(DEFAULT_CURRENCY).to_string()),
        };
        let (status, body) = self.post_json("/api/promos/validate", &payload).await?;
        decode(normalize(status, &body)?)
    }

    pub async fn create_checkout_session(
        &self,
        items: &[CartItem],
        customer_email: Option<&str>,
    ) -> Result<String, SubmitError> {
        if items.is_empty() {
            return Err(SubmitError::EmptyCart);
        }
        let payload = CreateSessionRequest {
            items: Some(
                items
                    .iter()
                    .map(|item| SessionItemRequest {
                        id: item.id.clone(),
                        quantity: item.quantity,
                        name: Some(item.name.clone()),
                        price: Some(item.price),
                        image: item.image.clone(),
                        currency: Some(DEFAULT_CURRENCY.to_string()),
                    })
                    .collect(),
            ),
            customer_email: customer_email
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_string),
        };
        let (status, body) = self.post_json("/api/checkout/session", &payload).await?;
        let created: CheckoutSessionCreated = decode(normalize(status, &body)?)?;
        Ok(created.url)
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<(StatusCode, String), SubmitError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .map_err(|err| SubmitError::from_reqwest(err, self.timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SubmitError::from_reqwest(err, self.timeout))?;
        Ok((status, body))
    }
}

/// Coerce cart lines into the order wire shape. Rejects an empty cart.
pub fn build_order_payload(
    items: &[CartItem],
    customer: &Customer,
    total: f64,
    promo_code: Option<&str>,
) -> Result<CreateOrderRequest, SubmitError> {
    if items.is_empty() {
        return Err(SubmitError::EmptyCart);
    }
    let currency = DEFAULT_CURRENCY.to_string();
    let items = items
        .iter()
        .map(|item| CheckoutItem {
            id: item.id.clone(),
            name: item.name.clone(),
            image: Some(
                item.image
                    .clone()
                    .filter(|image| !image.trim().is_empty())
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            ),
            price: if item.price.is_finite() { item.price } else { 0.0 },
            quantity: item.quantity,
            currency: Some(currency.clone()),
        })
        .collect();

    Ok(CreateOrderRequest {
        customer: Some(customer.trimmed()),
        items: Some(items),
        total: Some(round2(total)),
        currency: Some(currency),
        created_at: Some(Utc::now().to_rfc3339()),
        promo_code: promo_code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string),
    })
}

fn message_field(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

/// Shared status/body normalisation. `Ok(None)` is a 2xx with a non-JSON body.
fn normalize(status: StatusCode, body: &str) -> Result<Option<Value>, SubmitError> {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let code = status.as_u16();

    match parsed {
        None if status.is_success() => Ok(None),
        None => {
            let text = body.trim();
            Err(SubmitError::Rejected {
                status: code,
                message: if text.is_empty() {
                    format!("HTTP {code}")
                } else {
                    text.to_string()
                },
            })
        }
        Some(value) if !status.is_success() => Err(SubmitError::Rejected {
            status: code,
            message: message_field(&value).unwrap_or_else(|| format!("HTTP {code}")),
        }),
        Some(value) if value.get("success").and_then(Value::as_bool) == Some(false) => {
            Err(SubmitError::Rejected {
                status: code,
                message: message_field(&value)
                    .unwrap_or_else(|| "Request was not accepted".to_string()),
            })
        }
        Some(value) => Ok(Some(value)),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Option<Value>) -> Result<T, SubmitError> {
    let value = value.ok_or_else(|| SubmitError::Decode("expected a JSON body".into()))?;
    serde_json::from_value(value).map_err(|err| SubmitError::Decode(err.to_string()))
}

pub fn interpret_response(status: StatusCode, body: &str) -> Result<OrderAck, SubmitError> {
    match normalize(status, body)? {
        None => Ok(OrderAck {
            success: true,
            message: Some(body.trim().to_string()).filter(|text| !text.is_empty()),
            order_id: None,
        }),
        Some(value) => Ok(OrderAck {
            success: true,
            message: value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            order_id: value
                .get("orderId")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
    }
}
