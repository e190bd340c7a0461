use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

/// Deliveries older than this are rejected as replays.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Checkout session not found")]
    NotFound,

    #[error("Stripe response missing {0}")]
    MissingField(&'static str),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed signature header")]
    Malformed,
    #[error("timestamp outside tolerance")]
    Stale,
    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItemInput {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub unit_amount: i64,
    pub currency: String,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub line_items: Vec<LineItemInput>,
    pub customer_email: Option<String>,
    pub client_reference_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub shipping_countries: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeAddress {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<StripeAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeShippingDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<StripeAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeCollectedInformation {
    #[serde(default)]
    pub shipping_details: Option<StripeShippingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripePrice {
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeLineItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub price: Option<StripePrice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    pub shipping_details: Option<StripeShippingDetails>,
    #[serde(default)]
    pub collected_information: Option<StripeCollectedInformation>,
    #[serde(default)]
    pub line_items: Option<StripeList<StripeLineItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
    webhook_secret: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

impl StripeClient {
    pub fn new(config: &StripeConfig, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    #[instrument(skip(self, session), fields(items = session.line_items.len()))]
    pub async fn create_session(&self, session: &NewSession) -> Result<StripeSession, PaymentError> {
        let form = session_form(session);
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;
        let created: StripeSession = read_json(response).await?;
        tracing::info!(session_id = %created.id, "checkout session created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn retrieve_session(&self, id: &str) -> Result<StripeSession, PaymentError> {
        let mut url = Url::parse(&format!("{}/v1/checkout/sessions/", self.api_base))?.join(id)?;
        url.query_pairs_mut().append_pair("expand[]", "line_items");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;
        read_json(response).await
    }

    pub fn verify_webhook(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;
        verify_signature(
            payload,
            header,
            self.webhook_secret.expose_secret(),
            chrono::Utc::now().timestamp(),
            SIGNATURE_TOLERANCE_SECS,
        )
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(PaymentError::NotFound);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .and_then(|env| env.error.message)
            .unwrap_or(body);
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

/// Form-encode a session in Stripe's bracketed key style.
pub fn session_form(session: &NewSession) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("success_url".into(), session.success_url.clone()),
        ("cancel_url".into(), session.cancel_url.clone()),
    ];
    if let Some(email) = &session.customer_email {
        form.push(("customer_email".into(), email.clone()));
    }
    if let Some(reference) = &session.client_reference_id {
        form.push(("client_reference_id".into(), reference.clone()));
    }
    for (i, country) in session.shipping_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.clone(),
        ));
    }
    for (i, item) in session.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        form.push((format!("{prefix}[price_data][currency]"), item.currency.clone()));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(description) = &item.description {
            form.push((
                format!("{prefix}[price_data][product_data][description]"),
                description.clone(),
            ));
        }
        if let Some(image) = &item.image {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
    }
    form
}

/// Check a `t=<unix>,v1=<hex>[,v1=<hex>...]` header against
/// HMAC-SHA256(secret, "<t>.<payload>").
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Constant-time comparison per candidate.
    let matched = signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - ts).abs() > tolerance_secs {
        return Err(SignatureError::Stale);
    }
    Ok(())
}

/// Build a valid header for `payload`; used by tests and local tooling.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = sign_payload(payload, SECRET, 1_700_000_000).unwrap();
        assert_eq!(verify_signature(payload, &header, SECRET, 1_700_000_010, 300), Ok(()));
    }

    #[test]
    fn accepts_any_matching_v1_candidate() {
        let payload = b"{}";
        let good = sign_payload(payload, SECRET, 100).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=100,v1=deadbeef,v0=abc,v1={good_sig}");
        assert_eq!(verify_signature(payload, &header, SECRET, 100, 300), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign_payload(b"original", SECRET, 100).unwrap();
        assert_eq!(
            verify_signature(b"tampered", &header, SECRET, 100, 300),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign_payload(b"body", "other_secret", 100).unwrap();
        assert_eq!(
            verify_signature(b"body", &header, SECRET, 100, 300),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = sign_payload(b"body", SECRET, 100).unwrap();
        assert_eq!(
            verify_signature(b"body", &header, SECRET, 100 + 301, 300),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        for header in ["", "garbage", "t=abc,v1=00", "t=100", "v1=00"] {
            assert_eq!(
                verify_signature(b"body", header, SECRET, 100, 300),
                Err(SignatureError::Malformed),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn form_uses_bracketed_keys() {
        let form = session_form(&NewSession {
            line_items: vec![LineItemInput {
                name: "Peptide-003".into(),
                description: Some("10 mg vial".into()),
                image: None,
                unit_amount: 49999,
                currency: "usd".into(),
                quantity: 2,
            }],
            customer_email: Some("ada@lab.test".into()),
            client_reference_id: None,
            success_url: "https://shop.test/checkout/success?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "https://shop.test/cart".into(),
            shipping_countries: vec!["US".into()],
        });
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("customer_email"), Some("ada@lab.test"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("49999"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[0][price_data][product_data][name]"), Some("Peptide-003"));
        assert_eq!(get("shipping_address_collection[allowed_countries][0]"), Some("US"));
        assert_eq!(get("line_items[0][price_data][product_data][images][0]"), None);
    }

    #[test]
    fn session_tolerates_sparse_payloads() {
        let session: StripeSession = serde_json::from_str(r#"{"id":"cs_test_1"}"#).unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert!(session.line_items.is_none());
    }
}
