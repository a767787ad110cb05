//! Service configuration
//!
//! Everything is read once from the environment by [`AppConfig::from_env`]
//! and handed to the components that need it; nothing reads the environment
//! afterwards.

use crate::domain::aggregates::PriorityThresholds;
use crate::shipping::ShippingRates;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Content store connection
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store API (e.g. "https://abc123.api.example.io"). `None` selects the in-process store.
    pub base_url: Option<String>,
    pub dataset: String,
    pub api_version: String,
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

/// Transactional mail endpoint used for invoices
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub from_address: String,
    pub from_name: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyConfig {
    pub domestic: String,
    pub international: String,
    /// Domestic units per one international unit
    pub international_rate: Decimal,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self { domestic: "NPR".into(), international: "USD".into(), international_rate: Decimal::new(1335, 1) }
    }
}

/// Settings the orchestrator is constructed with
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// ISO country code treated as domestic
    pub home_country: String,
    pub currency: CurrencyConfig,
    pub shipping: ShippingRates,
    pub priority: PriorityThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            home_country: "NP".into(),
            currency: CurrencyConfig::default(),
            shipping: ShippingRates::default(),
            priority: PriorityThresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            home_country: env_or("HOME_COUNTRY", defaults.home_country),
            currency: CurrencyConfig {
                domestic: env_or("DOMESTIC_CURRENCY", defaults.currency.domestic),
                international: env_or("INTERNATIONAL_CURRENCY", defaults.currency.international),
                international_rate: env_parse("INTERNATIONAL_RATE", defaults.currency.international_rate),
            },
            shipping: ShippingRates {
                domestic_base: env_parse("DOMESTIC_SHIPPING_BASE", defaults.shipping.domestic_base),
                domestic_per_kg: env_parse("DOMESTIC_SHIPPING_PER_KG", defaults.shipping.domestic_per_kg),
                international: defaults.shipping.international,
            },
            priority: PriorityThresholds {
                high: env_parse("PRIORITY_HIGH_THRESHOLD", defaults.priority.high),
                urgent: env_parse("PRIORITY_URGENT_THRESHOLD", defaults.priority.urgent),
                quality_check: env_parse("QUALITY_CHECK_THRESHOLD", defaults.priority.quality_check),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub store: StoreConfig,
    pub mail: MailConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8083),
            database_url: env_opt("DATABASE_URL"),
            nats_url: env_opt("NATS_URL"),
            store: StoreConfig {
                base_url: env_opt("STORE_BASE_URL"),
                dataset: env_or("STORE_DATASET", "production".into()),
                api_version: env_or("STORE_API_VERSION", "2021-06-07".into()),
                token: env_opt("STORE_TOKEN"),
                timeout: env_parse("STORE_TIMEOUT_SECS", 30),
            },
            mail: MailConfig {
                endpoint: env_opt("MAIL_ENDPOINT"),
                api_key: env_opt("MAIL_API_KEY"),
                from_address: env_or("MAIL_FROM_ADDRESS", "orders@localhost".into()),
                from_name: env_or("MAIL_FROM_NAME", "Storefront".into()),
                timeout: env_parse("MAIL_TIMEOUT_SECS", 30),
            },
            pipeline: PipelineConfig::from_env(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env_opt(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
