use std::{fs, io};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::{
    config::PromoSource,
    dto::promos::{PromoValidated, ValidatePromoRequest},
    error::{AppError, AppResult},
    models::{Promo, PromoKind},
    money::{DEFAULT_CURRENCY, round2},
};

#[derive(Debug, Error)]
pub enum PromoLoadError {
    #[error("failed to read promo file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse promo file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PromoBook {
    promos: Vec<Promo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discount {
    pub discount_amount: f64,
    pub new_total: f64,
    pub free_shipping: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromoOutcome {
    Invalid { reason: String },
    Valid { promo: Promo, discount: Discount },
}

impl PromoOutcome {
    fn invalid(reason: impl Into<String>) -> Self {
        PromoOutcome::Invalid {
            reason: reason.into(),
        }
    }
}

impl PromoBook {
    pub fn new(promos: Vec<Promo>) -> Self {
        Self { promos }
    }

    // Inline JSON wins; a missing file is an empty promo set.
    pub fn load(source: &PromoSource) -> Result<Self, PromoLoadError> {
        if let Some(raw) = source.inline_json.as_deref() {
            match serde_json::from_str::<Vec<Promo>>(raw) {
                Ok(promos) => {
                    tracing::info!(count = promos.len(), "loaded promos from PROMOS_JSON");
                    return Ok(Self::new(promos));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "invalid PROMOS_JSON, falling back to promo file");
                }
            }
        }

        let path = source.file.display().to_string();
        let raw = match fs::read_to_string(&source.file) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "no promo file, promo codes disabled");
                return Ok(Self::default());
            }
            Err(source) => return Err(PromoLoadError::Read { path, source }),
        };
        let promos: Vec<Promo> = serde_json::from_str(&raw)
            .map_err(|source| PromoLoadError::Parse { path: path.clone(), source })?;
        tracing::info!(count = promos.len(), path = %path, "loaded promos from file");
        Ok(Self::new(promos))
    }

    pub fn len(&self) -> usize {
        self.promos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promos.is_empty()
    }

    pub fn find(&self, code: &str) -> Option<&Promo> {
        let search = code.trim();
        if search.is_empty() {
            return None;
        }
        self.promos
            .iter()
            .find(|promo| promo.code.trim().eq_ignore_ascii_case(search))
    }

    pub fn validate(
        &self,
        code: Option<&str>,
        total: f64,
        currency: Option<&str>,
        now: DateTime<Utc>,
    ) -> PromoOutcome {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return PromoOutcome::invalid("No promo code provided");
        };
        let Some(promo) = self.find(code) else {
            return PromoOutcome::invalid("Invalid promo code");
        };

        if let Some(restricted) = promo.currency.as_deref().filter(|c| !c.trim().is_empty()) {
            let requested = currency
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_CURRENCY);
            if !restricted.trim().eq_ignore_ascii_case(requested) {
                return PromoOutcome::invalid("Promo not valid for currency");
            }
        }

        if let Some(min_total) = promo.min_total.filter(|m| *m > 0.0) {
            if total < min_total {
                return PromoOutcome::invalid(format!("Requires minimum total of {min_total}"));
            }
        }

        if let Some(expires_at) = promo
            .expires_at
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            match parse_expiry(expires_at) {
                Some(expiry) if expiry >= now => {}
                _ => return PromoOutcome::invalid("Promo expired"),
            }
        }

        PromoOutcome::Valid {
            promo: promo.clone(),
            discount: compute_discount(promo, total),
        }
    }
}

/// Discount of `promo` against `total`, clamped to `[0, total]`.
pub fn compute_discount(promo: &Promo, total: f64) -> Discount {
    let (raw, free_shipping) = match promo.kind {
        PromoKind::Percent => (round2(total * (promo.amount / 100.0)), false),
        PromoKind::Fixed => (promo.amount, false),
        PromoKind::FreeShipping => (0.0, true),
    };
    let raw = if raw.is_finite() { raw } else { 0.0 };
    let discount_amount = raw.min(total).max(0.0);
    Discount {
        discount_amount,
        new_total: round2(total - discount_amount),
        free_shipping,
    }
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn validate_promo(
    promos: &PromoBook,
    payload: ValidatePromoRequest,
) -> AppResult<PromoValidated> {
    let total = payload.total.unwrap_or(0.0);
    if !total.is_finite() || total < 0.0 {
        return Err(AppError::BadRequest("Invalid total".into()));
    }
    match promos.validate(
        payload.code.as_deref(),
        total,
        payload.currency.as_deref(),
        Utc::now(),
    ) {
        PromoOutcome::Invalid { reason } => Err(AppError::BadRequest(reason)),
        PromoOutcome::Valid { promo, discount } => Ok(PromoValidated {
            success: true,
            promo,
            discount_amount: discount.discount_amount,
            new_total: discount.new_total,
            free_shipping: discount.free_shipping,
        }),
    }
}
