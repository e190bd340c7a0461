use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub price: f64,
    pub dosage: String,
    pub purity: String,
    pub form: String,
    pub storage: String,
    pub description: String,
    pub full_description: String,
    pub image: String,
    pub coa_file: String,
    pub in_stock: bool,
    pub lead_time: String,
    pub category: String,
    pub featured: bool,
}

/// One line of the client cart. At most one per `id` inside a cart store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: Some(product.image.clone()),
            sku: Some(product.sku.clone()),
            quantity: 1,
        }
    }

    pub fn line_total(&self) -> f64 {
        let price = if self.price.is_finite() { self.price } else { 0.0 };
        price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Address {
    Structured {
        street: String,
        city: String,
        zip: String,
        country: String,
    },
    Text(String),
}

impl Address {
    pub fn is_blank(&self) -> bool {
        match self {
            Address::Text(text) => text.trim().is_empty(),
            Address::Structured {
                street,
                city,
                zip,
                country,
            } => [street, city, zip, country]
                .iter()
                .any(|part| part.trim().is_empty()),
        }
    }

    pub fn trimmed(&self) -> Self {
        match self {
            Address::Text(text) => Address::Text(text.trim().to_string()),
            Address::Structured {
                street,
                city,
                zip,
                country,
            } => Address::Structured {
                street: street.trim().to_string(),
                city: city.trim().to_string(),
                zip: zip.trim().to_string(),
                country: country.trim().to_string(),
            },
        }
    }

    pub fn one_line(&self) -> String {
        match self {
            Address::Text(text) => text.trim().to_string(),
            Address::Structured {
                street,
                city,
                zip,
                country,
            } => format!(
                "{}, {} {}, {}",
                street.trim(),
                city.trim(),
                zip.trim(),
                country.trim()
            ),
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::Text(String::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Customer {
    /// Copy with surrounding whitespace removed; blank optionals become `None`.
    pub fn trimmed(&self) -> Self {
        fn opt(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: opt(&self.phone),
            address: self.address.trimmed(),
            company: opt(&self.company),
            notes: opt(&self.notes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromoKind {
    Percent,
    Fixed,
    FreeShipping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Promo {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: PromoKind,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Accepts a number, a numeric string or anything else (read as 0).
fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let amount = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if amount.is_finite() { amount } else { 0.0 })
}

// Null reads as 0; anything non-numeric becomes NaN so validation can reject it.
fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => 0.0,
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

// Whole non-negative numbers only; everything else reads as 0.
fn lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let quantity = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(quantity.and_then(|q| u32::try_from(q).ok()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_accepts_text_and_structured() {
        let text: Address = serde_json::from_str(r#""1 Lab Way, Boston""#).unwrap();
        assert_eq!(text, Address::Text("1 Lab Way, Boston".into()));

        let structured: Address = serde_json::from_str(
            r#"{"street":"1 Lab Way","city":"Boston","zip":"02110","country":"US"}"#,
        )
        .unwrap();
        assert_eq!(structured.one_line(), "1 Lab Way, Boston 02110, US");
        assert!(!structured.is_blank());
    }

    #[test]
    fn structured_address_with_blank_part_is_blank() {
        let address = Address::Structured {
            street: "1 Lab Way".into(),
            city: " ".into(),
            zip: "02110".into(),
            country: "US".into(),
        };
        assert!(address.is_blank());
    }

    #[test]
    fn customer_trim_drops_blank_optionals() {
        let customer = Customer {
            name: "  Ada ".into(),
            email: " ada@lab.test ".into(),
            phone: Some("   ".into()),
            address: Address::Text(" 1 Lab Way ".into()),
            company: Some(" Acme ".into()),
            notes: None,
        }
        .trimmed();
        assert_eq!(customer.name, "Ada");
        assert_eq!(customer.email, "ada@lab.test");
        assert_eq!(customer.phone, None);
        assert_eq!(customer.company.as_deref(), Some("Acme"));
        assert_eq!(customer.address, Address::Text("1 Lab Way".into()));
    }

    #[test]
    fn cart_item_null_price_reads_as_zero() {
        let item: CartItem =
            serde_json::from_str(r#"{"id":"a","price":null,"quantity":2}"#).unwrap();
        assert_eq!(item.price, 0.0);
        assert_eq!(item.name, "");

        let nan = CartItem {
            price: f64::NAN,
            ..item
        };
        let back: CartItem = serde_json::from_str(&serde_json::to_string(&nan).unwrap()).unwrap();
        assert_eq!(back.price, 0.0);
        assert_eq!(back.quantity, 2);
    }

    #[test]
    fn checkout_item_fields_are_lenient() {
        let item: CheckoutItem = serde_json::from_str(
            r#"{"id":"a","name":"A","price":"12.50","quantity":"3"}"#,
        )
        .unwrap();
        assert_eq!(item.price, 12.5);
        assert_eq!(item.quantity, 3);

        let item: CheckoutItem =
            serde_json::from_str(r#"{"id":"a","name":"A","price":null,"quantity":1}"#).unwrap();
        assert_eq!(item.price, 0.0);

        let item: CheckoutItem =
            serde_json::from_str(r#"{"id":"a","name":"A","price":"abc","quantity":-1}"#).unwrap();
        assert!(item.price.is_nan());
        assert_eq!(item.quantity, 0);

        let item: CheckoutItem =
            serde_json::from_str(r#"{"id":"a","name":"A","price":5,"quantity":1.5}"#).unwrap();
        assert_eq!(item.quantity, 0);
    }

    #[test]
    fn promo_amount_is_lenient() {
        let promo: Promo =
            serde_json::from_str(r#"{"code":"X","type":"fixed","amount":"12.5"}"#).unwrap();
        assert_eq!(promo.amount, 12.5);
        let promo: Promo =
            serde_json::from_str(r#"{"code":"X","type":"fixed","amount":"lots"}"#).unwrap();
        assert_eq!(promo.amount, 0.0);
        let promo: Promo = serde_json::from_str(
            r#"{"code":"SHIP","type":"free_shipping","minTotal":50,"expiresAt":null}"#,
        )
        .unwrap();
        assert_eq!(promo.kind, PromoKind::FreeShipping);
        assert_eq!(promo.min_total, Some(50.0));
    }

    #[test]
    fn cart_item_missing_price_is_zero() {
        let item: CartItem =
            serde_json::from_str(r#"{"id":"peptide-001","name":"GLP","quantity":2}"#).unwrap();
        assert_eq!(item.line_total(), 0.0);
    }
}
