use std::{sync::Arc, time::Duration};

use moka::future::Cache;

use crate::{
    catalog::Catalog,
    config::AppConfig,
    mailer::Mailer,
    middleware::rate_limit::OrderRateLimiter,
    payments::StripeClient,
    services::promo_service::PromoBook,
};

/// How long a processed webhook delivery id is remembered.
const WEBHOOK_DEDUPE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Catalog,
    pub promos: Arc<PromoBook>,
    pub mailer: Option<Mailer>,
    pub stripe: Option<StripeClient>,
    pub order_limiter: OrderRateLimiter,
    pub processed_events: Cache<String, ()>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let promos = PromoBook::load(&config.promos)?;
        tracing::info!(count = promos.len(), "promo codes loaded");
        Self::with_promos(config, promos)
    }

    pub fn with_promos(config: AppConfig, promos: PromoBook) -> anyhow::Result<Self> {
        let mailer = config
            .mail
            .as_ref()
            .map(|mail| Mailer::from_config(mail, config.upstream_timeout))
            .transpose()?;
        let stripe = config
            .stripe
            .as_ref()
            .map(|stripe| StripeClient::new(stripe, config.upstream_timeout))
            .transpose()?;
        let order_limiter = OrderRateLimiter::new(config.order_rate_limit, config.trust_proxy);
        let processed_events = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(WEBHOOK_DEDUPE_TTL)
            .build();

        Ok(Self {
            config: Arc::new(config),
            catalog: Catalog,
            promos: Arc::new(promos),
            mailer,
            stripe,
            order_limiter,
            processed_events,
        })
    }
}
