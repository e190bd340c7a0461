use std::{env, net::IpAddr, path::PathBuf, time::Duration};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_SENDGRID_API_BASE: &str = "https://api.sendgrid.com";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which checkout path this deployment serves. Only one is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Email,
    Hosted,
}

#[derive(Debug, Clone)]
pub enum MailConfig {
    SendGrid {
        api_key: SecretString,
        from_address: String,
        api_base: String,
    },
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: SecretString,
        from_address: String,
    },
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub webhook_secret: SecretString,
    pub api_base: String,
    pub shipping_countries: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PromoSource {
    pub inline_json: Option<String>,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub budget: u32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub frontend_url: String,
    pub allowed_origins: Vec<String>,
    pub checkout_mode: CheckoutMode,
    pub sales_email: String,
    pub mail: Option<MailConfig>,
    pub stripe: Option<StripeConfig>,
    pub promos: PromoSource,
    pub order_rate_limit: RateLimitConfig,
    pub trust_proxy: bool,
    pub upstream_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let host = vars
            .or_default("APP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("APP_HOST".into(), e.to_string()))?;
        let port = vars.parse_or("APP_PORT", 4000u16)?;

        let frontend_url = trim_base_url(&vars.required("FRONTEND_URL")?);
        let mut allowed_origins = vec![frontend_url.clone()];
        if let Some(extra) = vars.optional("ALLOWED_ORIGINS") {
            allowed_origins.extend(
                extra
                    .split(',')
                    .map(trim_base_url)
                    .filter(|o| !o.is_empty()),
            );
        }

        let checkout_mode = match vars.or_default("CHECKOUT_MODE", "email").to_lowercase().as_str()
        {
            "email" => CheckoutMode::Email,
            "hosted" => CheckoutMode::Hosted,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "CHECKOUT_MODE".into(),
                    format!("expected `email` or `hosted`, got `{other}`"),
                ));
            }
        };

        let sales_email = vars.required("SALES_EMAIL")?;
        let mail = MailConfig::from_vars(&vars)?;
        let stripe = StripeConfig::from_vars(&vars)?;

        match checkout_mode {
            CheckoutMode::Email if mail.is_none() => {
                return Err(ConfigError::MissingEnvVar(
                    "SENDGRID_API_KEY or SMTP_HOST".into(),
                ));
            }
            CheckoutMode::Hosted if stripe.is_none() => {
                return Err(ConfigError::MissingEnvVar("STRIPE_SECRET_KEY".into()));
            }
            _ => {}
        }

        let promos = PromoSource {
            inline_json: vars.optional("PROMOS_JSON"),
            file: PathBuf::from(vars.or_default("PROMOS_FILE", "promos.json")),
        };

        let budget = vars.parse_or("ORDER_RATE_LIMIT", 10u32)?;
        let window_secs = vars.parse_or("ORDER_RATE_WINDOW_SECS", 60u64)?;
        if budget == 0 || window_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDER_RATE_LIMIT".into(),
                "budget and window must be positive".into(),
            ));
        }

        let trust_proxy = vars.parse_or("TRUST_PROXY", false)?;
        let upstream_timeout = Duration::from_secs(vars.parse_or("UPSTREAM_TIMEOUT_SECS", 30u64)?);

        Ok(Self {
            host,
            port,
            frontend_url,
            allowed_origins,
            checkout_mode,
            sales_email,
            mail,
            stripe,
            promos,
            order_rate_limit: RateLimitConfig {
                budget,
                window: Duration::from_secs(window_secs),
            },
            trust_proxy,
            upstream_timeout,
        })
    }
}

impl MailConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Option<Self>, ConfigError> {
        if let Some(api_key) = vars.optional("SENDGRID_API_KEY") {
            return Ok(Some(MailConfig::SendGrid {
                api_key: SecretString::from(api_key),
                from_address: vars.required("SENDGRID_FROM_EMAIL")?,
                api_base: trim_base_url(&vars.or_default("SENDGRID_API_BASE", DEFAULT_SENDGRID_API_BASE)),
            }));
        }
        if let Some(host) = vars.optional("SMTP_HOST") {
            return Ok(Some(MailConfig::Smtp {
                host,
                port: vars.parse_or("SMTP_PORT", 587u16)?,
                username: vars.required("SMTP_USERNAME")?,
                password: SecretString::from(vars.required("SMTP_PASSWORD")?),
                from_address: vars.required("SMTP_FROM")?,
            }));
        }
        Ok(None)
    }
}

impl StripeConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Option<Self>, ConfigError> {
        let Some(secret_key) = vars.optional("STRIPE_SECRET_KEY") else {
            return Ok(None);
        };
        Ok(Some(StripeConfig {
            secret_key: SecretString::from(secret_key),
            webhook_secret: SecretString::from(vars.required("STRIPE_WEBHOOK_SECRET")?),
            api_base: trim_base_url(&vars.or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE)),
            shipping_countries: vars
                .or_default("STRIPE_SHIPPING_COUNTRIES", "US")
                .split(',')
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }))
    }
}

pub fn trim_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    const EMAIL_BASE: &[(&str, &str)] = &[
        ("FRONTEND_URL", "https://shop.example.com//"),
        ("SALES_EMAIL", "sales@example.com"),
        ("SENDGRID_API_KEY", "SG.key"),
        ("SENDGRID_FROM_EMAIL", "orders@example.com"),
    ];

    #[test]
    fn email_mode_defaults() {
        let config = load(EMAIL_BASE).expect("config");
        assert_eq!(config.frontend_url, "https://shop.example.com");
        assert_eq!(config.allowed_origins, vec!["https://shop.example.com"]);
        assert_eq!(config.checkout_mode, CheckoutMode::Email);
        assert_eq!(config.port, 4000);
        assert_eq!(config.order_rate_limit.budget, 10);
        assert_eq!(config.order_rate_limit.window, Duration::from_secs(60));
        assert!(!config.trust_proxy);
        match config.mail {
            Some(MailConfig::SendGrid { api_key, api_base, .. }) => {
                assert_eq!(api_key.expose_secret(), "SG.key");
                assert_eq!(api_base, DEFAULT_SENDGRID_API_BASE);
            }
            other => panic!("unexpected mail config: {other:?}"),
        }
    }

    #[test]
    fn missing_sales_email_fails_fast() {
        let err = load(&[("FRONTEND_URL", "https://shop.example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SALES_EMAIL"));
    }

    #[test]
    fn email_mode_requires_a_provider() {
        let err = load(&[
            ("FRONTEND_URL", "https://shop.example.com"),
            ("SALES_EMAIL", "sales@example.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn hosted_mode_requires_webhook_secret() {
        let err = load(&[
            ("FRONTEND_URL", "https://shop.example.com"),
            ("SALES_EMAIL", "sales@example.com"),
            ("CHECKOUT_MODE", "hosted"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STRIPE_WEBHOOK_SECRET"));
    }

    #[test]
    fn hosted_mode_parses_shipping_countries() {
        let config = load(&[
            ("FRONTEND_URL", "https://shop.example.com"),
            ("SALES_EMAIL", "sales@example.com"),
            ("CHECKOUT_MODE", "HOSTED"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
            ("STRIPE_SHIPPING_COUNTRIES", "us, ca"),
        ])
        .expect("config");
        assert_eq!(config.checkout_mode, CheckoutMode::Hosted);
        let stripe = config.stripe.expect("stripe config");
        assert_eq!(stripe.shipping_countries, vec!["US", "CA"]);
        assert_eq!(stripe.api_base, DEFAULT_STRIPE_API_BASE);
    }

    #[test]
    fn rejects_unknown_mode_and_bad_numbers() {
        let mut pairs = EMAIL_BASE.to_vec();
        pairs.push(("CHECKOUT_MODE", "carrier-pigeon"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidEnvVar(..))));

        let mut pairs = EMAIL_BASE.to_vec();
        pairs.push(("ORDER_RATE_LIMIT", "0"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidEnvVar(..))));
    }

    #[test]
    fn extra_origins_are_appended() {
        let mut pairs = EMAIL_BASE.to_vec();
        pairs.push(("ALLOWED_ORIGINS", "https://www.example.com/, http://localhost:8080"));
        let config = load(&pairs).expect("config");
        assert_eq!(
            config.allowed_origins,
            vec![
                "https://shop.example.com",
                "https://www.example.com",
                "http://localhost:8080"
            ]
        );
    }
}
