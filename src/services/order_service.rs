use std::sync::LazyLock;

use askama::Template;
use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::{
    dto::orders::CreateOrderRequest,
    error::{AppError, AppResult},
    mailer::{MailError, OutgoingEmail},
    models::{Address, CheckoutItem, Customer, Promo},
    money::{DEFAULT_CURRENCY, format_usd, round2},
    response::OrderAck,
    services::promo_service::{Discount, PromoBook, PromoOutcome},
    state::AppState,
};

pub const ORDER_RECEIVED: &str = "Order received. Our sales team will contact you shortly.";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+\d()\-.\s]{7,20}$").expect("Invalid regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub customer: Customer,
    pub items: Vec<CheckoutItem>,
    pub total: f64,
    pub currency: String,
    pub promo: Option<(Promo, Discount)>,
}

impl ValidatedOrder {
    /// Amount owed after any promo discount.
    pub fn final_total(&self) -> f64 {
        match &self.promo {
            Some((_, discount)) => discount.new_total,
            None => self.total,
        }
    }
}

pub async fn create_order(state: &AppState, payload: CreateOrderRequest) -> AppResult<OrderAck> {
    let now = Utc::now();
    let order = validate_order(payload, &state.promos, now)?;
    let order_id = build_order_id(now);

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("no mail provider configured")))?;
    let email = compose_notification(&order, &order_id, &state.config.sales_email, now)?;
    mailer.send(&email).await?;

    tracing::info!(
        order_id = %order_id,
        items = order.items.len(),
        total = order.final_total(),
        "order accepted"
    );
    Ok(OrderAck::accepted(order_id, ORDER_RECEIVED))
}

pub fn validate_order(
    payload: CreateOrderRequest,
    promos: &PromoBook,
    now: DateTime<Utc>,
) -> AppResult<ValidatedOrder> {
    let customer = payload
        .customer
        .map(|c| c.trimmed())
        .filter(|c| !c.name.is_empty() && !c.email.is_empty() && !c.address.is_blank())
        .ok_or_else(|| AppError::BadRequest("Missing required customer fields".into()))?;

    if !is_valid_email(&customer.email) {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    if let Some(phone) = &customer.phone {
        if !PHONE_RE.is_match(phone) {
            return Err(AppError::BadRequest("Invalid phone number".into()));
        }
    }

    let items = payload.items.unwrap_or_default();
    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    if items.iter().any(|item| item.quantity == 0) {
        return Err(AppError::BadRequest("Invalid item quantity".into()));
    }
    if items.iter().any(|item| !item.price.is_finite() || item.price < 0.0) {
        return Err(AppError::BadRequest("Invalid item price".into()));
    }

    let total = match payload.total {
        Some(total) if total.is_finite() && total > 0.0 => round2(total),
        _ => return Err(AppError::BadRequest("Invalid total".into())),
    };

    let currency = payload
        .currency
        .or_else(|| items.first().and_then(|item| item.currency.clone()))
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let promo = match payload.promo_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            match promos.validate(Some(code), total, Some(&currency), now) {
                PromoOutcome::Valid { promo, discount } => Some((promo, discount)),
                PromoOutcome::Invalid { reason } => return Err(AppError::BadRequest(reason)),
            }
        }
        _ => None,
    };

    Ok(ValidatedOrder {
        customer,
        items,
        total,
        currency,
        promo,
    })
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// `ORD-YYYYMMDD-xxxxxxxx`
pub fn build_order_id(now: DateTime<Utc>) -> String {
    let date = now.format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", date, &suffix[..8])
}

struct OrderLine<'a> {
    quantity: u32,
    name: &'a str,
    price: String,
    line_total: String,
}

struct OrderEmail<'a> {
    order_id: &'a str,
    name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    address: String,
    address_lines: Vec<String>,
    company: Option<&'a str>,
    notes: Option<&'a str>,
    lines: Vec<OrderLine<'a>>,
    has_promo: bool,
    subtotal: String,
    promo_code: &'a str,
    discount: String,
    free_shipping: bool,
    total: String,
    currency: String,
    received_at: String,
}

#[derive(Template)]
#[template(path = "email/new_order.html")]
struct NewOrderEmailHtml<'a> {
    order: &'a OrderEmail<'a>,
}

#[derive(Template)]
#[template(path = "email/new_order.txt")]
struct NewOrderEmailText<'a> {
    order: &'a OrderEmail<'a>,
}

pub fn compose_notification(
    order: &ValidatedOrder,
    order_id: &str,
    to: &str,
    received_at: DateTime<Utc>,
) -> Result<OutgoingEmail, MailError> {
    let c = &order.customer;
    let (promo_code, discount, free_shipping) = match &order.promo {
        Some((promo, discount)) => (
            promo.code.as_str(),
            format_usd(discount.discount_amount),
            discount.free_shipping,
        ),
        None => ("", String::new(), false),
    };
    let view = OrderEmail {
        order_id,
        name: &c.name,
        email: &c.email,
        phone: c.phone.as_deref(),
        address: c.address.one_line(),
        address_lines: address_lines(&c.address),
        company: c.company.as_deref(),
        notes: c.notes.as_deref(),
        lines: order
            .items
            .iter()
            .map(|item| OrderLine {
                quantity: item.quantity,
                name: &item.name,
                price: format_usd(item.price),
                line_total: format_usd(item.price * f64::from(item.quantity)),
            })
            .collect(),
        has_promo: order.promo.is_some(),
        subtotal: format_usd(order.total),
        promo_code,
        discount,
        free_shipping,
        total: format_usd(order.final_total()),
        currency: order.currency.to_uppercase(),
        received_at: received_at.to_rfc3339(),
    };

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: format!("New Order from {} ({})", c.name, order_id),
        text: NewOrderEmailText { order: &view }.render()?,
        html: NewOrderEmailHtml { order: &view }.render()?,
    })
}

fn address_lines(address: &Address) -> Vec<String> {
    match address {
        Address::Text(text) => vec![text.clone()],
        Address::Structured {
            street,
            city,
            zip,
            country,
        } => vec![street.clone(), format!("{city} {zip}"), country.clone()],
    }
}
