use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Promo;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ValidatePromoRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidated {
    pub success: bool,
    pub promo: Promo,
    pub discount_amount: f64,
    pub new_total: f64,
    pub free_shipping: bool,
}
