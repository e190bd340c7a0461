use askama::Template;
use chrono::Utc;

use crate::{
    catalog::Catalog,
    dto::checkout::{
        CheckoutSessionCreated, CreateSessionRequest, LineItemSummary, SessionItemRequest,
        SessionSummary, ShippingAddress, ShippingSummary, WebhookAck,
    },
    error::{AppError, AppResult},
    mailer::{MailError, Mailer, OutgoingEmail},
    money::{DEFAULT_CURRENCY, format_usd, from_minor_units, to_minor_units},
    payments::{
        LineItemInput, NewSession, PaymentError, StripeAddress, StripeClient, StripeEvent,
        StripeSession,
    },
    services::order_service::{build_order_id, is_valid_email},
    state::AppState,
};

pub const MAX_QUANTITY: u32 = 100;
pub const SESSION_COMPLETED: &str = "checkout.session.completed";

fn stripe(state: &AppState) -> AppResult<&StripeClient> {
    state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("payment processor not configured")))
}

pub async fn create_session(
    state: &AppState,
    payload: CreateSessionRequest,
) -> AppResult<CheckoutSessionCreated> {
    let stripe = stripe(state)?;
    let items = payload.items.unwrap_or_default();
    let line_items = build_line_items(&state.catalog, &items, &state.config.frontend_url)?;

    let customer_email = payload
        .customer_email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());
    if let Some(email) = &customer_email {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("Invalid email address".into()));
        }
    }

    let shipping_countries = state
        .config
        .stripe
        .as_ref()
        .map(|cfg| cfg.shipping_countries.clone())
        .unwrap_or_default();
    let frontend = &state.config.frontend_url;
    let session = NewSession {
        line_items,
        customer_email,
        client_reference_id: Some(build_order_id(Utc::now())),
        success_url: format!("{frontend}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{frontend}/cart"),
        shipping_countries,
    };

    let created = stripe.create_session(&session).await?;
    let url = created.url.ok_or(PaymentError::MissingField("url"))?;
    Ok(CheckoutSessionCreated { url })
}

pub fn build_line_items(
    catalog: &Catalog,
    items: &[SessionItemRequest],
    asset_base: &str,
) -> AppResult<Vec<LineItemInput>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("No items provided".into()));
    }

    items
        .iter()
        .map(|item| {
            let product = catalog
                .find(item.id.trim())
                .ok_or_else(|| AppError::BadRequest(format!("Unknown product: {}", item.id)))?;
            if !product.in_stock {
                return Err(AppError::BadRequest(format!(
                    "{} is out of stock",
                    product.name
                )));
            }
            if item.quantity == 0 || item.quantity > MAX_QUANTITY {
                return Err(AppError::BadRequest(format!(
                    "Invalid quantity for {}",
                    product.id
                )));
            }
            let unit_amount = to_minor_units(product.price);
            if unit_amount <= 0 {
                return Err(AppError::BadRequest(format!(
                    "{} is not available for online checkout",
                    product.name
                )));
            }
            Ok(LineItemInput {
                name: product.name.clone(),
                description: Some(product.description.clone()).filter(|d| !d.is_empty()),
                image: absolute_image_url(&product.image, asset_base),
                unit_amount,
                currency: DEFAULT_CURRENCY.to_string(),
                quantity: item.quantity,
            })
        })
        .collect()
}

fn absolute_image_url(image: &str, base: &str) -> Option<String> {
    let image = image.trim();
    if image.is_empty() {
        return None;
    }
    let lower = image.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        return Some(image.to_string());
    }
    if base.is_empty() {
        return None;
    }
    if image.starts_with('/') {
        Some(format!("{base}{image}"))
    } else {
        Some(format!("{base}/images/{image}"))
    }
}

pub fn validate_session_id(id: &str) -> AppResult<()> {
    let well_formed = id.starts_with("cs_")
        && id.len() <= 255
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid session id".into()))
    }
}

pub async fn get_session(state: &AppState, id: &str) -> AppResult<SessionSummary> {
    validate_session_id(id)?;
    let session = stripe(state)?.retrieve_session(id).await?;
    Ok(summarize_session(session))
}

fn shipping_address(address: StripeAddress) -> ShippingAddress {
    ShippingAddress {
        line1: address.line1,
        line2: address.line2,
        city: address.city,
        state: address.state,
        postal_code: address.postal_code,
        country: address.country,
    }
}

pub fn summarize_session(session: StripeSession) -> SessionSummary {
    let details = session.customer_details.unwrap_or_default();
    let shipping_details = session
        .collected_information
        .and_then(|info| info.shipping_details)
        .or(session.shipping_details);

    let shipping = match shipping_details {
        Some(sd) => Some(ShippingSummary {
            name: sd.name.or_else(|| details.name.clone()),
            phone: details.phone.clone(),
            address: sd.address.map(shipping_address),
        }),
        None => details.address.clone().map(|address| ShippingSummary {
            name: details.name.clone(),
            phone: details.phone.clone(),
            address: Some(shipping_address(address)),
        }),
    };

    let line_items = session
        .line_items
        .map(|list| list.data)
        .unwrap_or_default()
        .into_iter()
        .map(|item| {
            let price = item.price.unwrap_or_default();
            LineItemSummary {
                id: item.id,
                description: item.description,
                quantity: item.quantity.unwrap_or(0),
                unit_amount: price.unit_amount,
                currency: price.currency,
            }
        })
        .collect();

    SessionSummary {
        id: session.id,
        amount_total: session.amount_total,
        currency: session.currency,
        payment_status: session.payment_status,
        customer_email: session.customer_email.or(details.email),
        shipping,
        line_items,
    }
}

pub async fn handle_webhook(
    state: &AppState,
    signature: Option<&str>,
    payload: &[u8],
) -> AppResult<WebhookAck> {
    let stripe = stripe(state)?;
    if let Err(err) = stripe.verify_webhook(payload, signature) {
        tracing::warn!(error = %err, "rejected webhook delivery");
        return Err(AppError::BadRequest("Webhook signature verification failed".into()));
    }

    let event: StripeEvent = serde_json::from_slice(payload)
        .map_err(|_| AppError::BadRequest("Invalid webhook payload".into()))?;

    if event.kind != SESSION_COMPLETED {
        tracing::debug!(event_id = %event.id, kind = %event.kind, "ignoring webhook event");
        return Ok(WebhookAck { received: true });
    }

    let fresh = state
        .processed_events
        .entry(event.id.clone())
        .or_insert(())
        .await
        .is_fresh();
    if !fresh {
        tracing::info!(event_id = %event.id, "duplicate webhook delivery");
        return Ok(WebhookAck { received: true });
    }

    let session: StripeSession = match serde_json::from_value(event.data.object) {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(event_id = %event.id, error = %err, "unreadable checkout session");
            return Ok(WebhookAck { received: true });
        }
    };
    let reference = session.client_reference_id.clone();
    let summary = summarize_session(session);
    tracing::info!(event_id = %event.id, session_id = %summary.id, "checkout completed");

    match state.mailer.clone() {
        Some(mailer) => match compose_paid_notification(
            &summary,
            reference.as_deref(),
            &state.config.sales_email,
        ) {
            Ok(email) => {
                tokio::spawn(notify_sales(mailer, email, summary.id.clone()));
            }
            Err(err) => {
                tracing::error!(session_id = %summary.id, error = %err, "failed to render paid order notification");
            }
        },
        None => {
            tracing::warn!(session_id = %summary.id, "no mail provider; paid order not notified");
        }
    }

    Ok(WebhookAck { received: true })
}

async fn notify_sales(mailer: Mailer, email: OutgoingEmail, session_id: String) {
    match mailer.send(&email).await {
        Ok(()) => tracing::info!(%session_id, "paid order notification sent"),
        Err(err) => tracing::error!(%session_id, error = %err, "paid order notification failed"),
    }
}

struct PaidLine<'a> {
    quantity: u64,
    description: &'a str,
    unit: String,
}

struct PaidOrderEmail<'a> {
    label: &'a str,
    session_id: &'a str,
    customer: &'a str,
    lines: Vec<PaidLine<'a>>,
    ship_to: String,
    total: String,
}

#[derive(Template)]
#[template(path = "email/paid_order.html")]
struct PaidOrderEmailHtml<'a> {
    order: &'a PaidOrderEmail<'a>,
}

#[derive(Template)]
#[template(path = "email/paid_order.txt")]
struct PaidOrderEmailText<'a> {
    order: &'a PaidOrderEmail<'a>,
}

fn cents_label(cents: Option<i64>) -> String {
    cents
        .map(|cents| format_usd(from_minor_units(cents)))
        .unwrap_or_else(|| "-".into())
}

pub fn compose_paid_notification(
    summary: &SessionSummary,
    reference: Option<&str>,
    to: &str,
) -> Result<OutgoingEmail, MailError> {
    let label = reference.unwrap_or(&summary.id);
    let ship_to = summary
        .shipping
        .as_ref()
        .and_then(|s| s.address.as_ref())
        .map(|address| {
            [
                &address.line1,
                &address.line2,
                &address.city,
                &address.state,
                &address.postal_code,
                &address.country,
            ]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
        })
        .unwrap_or_default();

    let view = PaidOrderEmail {
        label,
        session_id: &summary.id,
        customer: summary.customer_email.as_deref().unwrap_or("-"),
        lines: summary
            .line_items
            .iter()
            .map(|item| PaidLine {
                quantity: item.quantity,
                description: item.description.as_deref().unwrap_or("item"),
                unit: cents_label(item.unit_amount),
            })
            .collect(),
        ship_to,
        total: cents_label(summary.amount_total),
    };

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: format!("Paid Order {label}"),
        text: PaidOrderEmailText { order: &view }.render()?,
        html: PaidOrderEmailHtml { order: &view }.render()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, quantity: u32) -> SessionItemRequest {
        SessionItemRequest {
            id: id.into(),
            quantity,
            name: Some("Free Stuff".into()),
            price: Some(0.01),
            image: None,
            currency: None,
        }
    }

    fn bad_request<T: std::fmt::Debug>(result: AppResult<T>) -> String {
        match result {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn reprices_from_catalog() {
        let catalog = Catalog;
        let items = build_line_items(&catalog, &[request("peptide-001", 3)], "https://shop.test")
            .unwrap();
        let product = catalog.find("peptide-001").unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, product.name);
        assert_eq!(items[0].unit_amount, to_minor_units(product.price));
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].currency, "usd");
        assert!(items[0].image.as_deref().unwrap().starts_with("https://shop.test/"));
    }

    #[test]
    fn rejects_unknown_unavailable_and_bad_quantities() {
        let catalog = Catalog;
        assert_eq!(
            bad_request(build_line_items(&catalog, &[], "")),
            "No items provided"
        );
        assert!(
            bad_request(build_line_items(&catalog, &[request("nope", 1)], ""))
                .starts_with("Unknown product")
        );
        let kit = catalog.all().iter().find(|p| !p.in_stock).unwrap();
        assert!(
            bad_request(build_line_items(&catalog, &[request(&kit.id, 1)], ""))
                .ends_with("out of stock")
        );
        for quantity in [0, MAX_QUANTITY + 1] {
            assert!(
                bad_request(build_line_items(&catalog, &[request("peptide-001", quantity)], ""))
                    .starts_with("Invalid quantity")
            );
        }
    }

    #[test]
    fn image_urls_are_made_absolute() {
        let base = "https://shop.test";
        assert_eq!(
            absolute_image_url("reta10.jpg", base).as_deref(),
            Some("https://shop.test/images/reta10.jpg")
        );
        assert_eq!(
            absolute_image_url("/img/a.png", base).as_deref(),
            Some("https://shop.test/img/a.png")
        );
        assert_eq!(
            absolute_image_url("https://cdn.test/a.png", base).as_deref(),
            Some("https://cdn.test/a.png")
        );
        assert_eq!(absolute_image_url("", base), None);
    }

    #[test]
    fn session_ids_are_format_checked() {
        assert!(validate_session_id("cs_test_a1B2c3").is_ok());
        let too_long = format!("cs_{}", "a".repeat(253));
        for bad in ["", "pi_123", "cs_../../admin", "cs_abc?x=1", too_long.as_str()] {
            assert!(validate_session_id(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn summarizes_processor_session() {
        let session: StripeSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "amount_total": 29998,
            "currency": "usd",
            "payment_status": "paid",
            "customer_email": null,
            "customer_details": {
                "email": "ada@lab.test",
                "name": "Ada",
                "phone": "+15550102030",
                "address": { "line1": "billing st", "country": "US" }
            },
            "collected_information": {
                "shipping_details": {
                    "name": "Ada L",
                    "address": { "line1": "1 Analytical Way", "city": "London", "postal_code": "N1", "country": "GB" }
                }
            },
            "line_items": {
                "object": "list",
                "data": [
                    { "id": "li_1", "description": "Peptide-001", "quantity": 2,
                      "price": { "unit_amount": 14999, "currency": "usd" } }
                ]
            }
        }))
        .unwrap();

        let summary = summarize_session(session);
        assert_eq!(summary.customer_email.as_deref(), Some("ada@lab.test"));
        assert_eq!(summary.amount_total, Some(29998));
        let shipping = summary.shipping.unwrap();
        assert_eq!(shipping.name.as_deref(), Some("Ada L"));
        assert_eq!(shipping.phone.as_deref(), Some("+15550102030"));
        assert_eq!(shipping.address.unwrap().city.as_deref(), Some("London"));
        assert_eq!(summary.line_items.len(), 1);
        assert_eq!(summary.line_items[0].quantity, 2);
        assert_eq!(summary.line_items[0].unit_amount, Some(14999));
    }

    #[test]
    fn summary_without_shipping_or_items() {
        let session: StripeSession =
            serde_json::from_value(serde_json::json!({ "id": "cs_test_2" })).unwrap();
        let summary = summarize_session(session);
        assert_eq!(summary.shipping, None);
        assert!(summary.line_items.is_empty());
    }

    #[test]
    fn paid_notification_escapes_descriptions() {
        let summary = SessionSummary {
            id: "cs_test_3".into(),
            amount_total: Some(1000),
            currency: Some("usd".into()),
            payment_status: Some("paid".into()),
            customer_email: Some("ada@lab.test".into()),
            shipping: None,
            line_items: vec![LineItemSummary {
                id: None,
                description: Some("<b>x</b>".into()),
                quantity: 1,
                unit_amount: Some(1000),
                currency: Some("usd".into()),
            }],
        };
        let email =
            compose_paid_notification(&summary, Some("ORD-20260101-abcdef12"), "sales@example.com")
                .unwrap();
        assert_eq!(email.subject, "Paid Order ORD-20260101-abcdef12");
        assert!(!email.html.contains("<b>"));
        assert!(!email.html.contains("</b>"));
        assert!(email.html.contains("<li>1 x "));
        assert!(email.html.contains(" - $10.00</li>"));
        assert!(email.text.contains("1 x <b>x</b> - $10.00"));
        assert!(email.text.contains("Total: $10.00"));
        assert!(!email.text.contains("Ship to"));
    }
}
