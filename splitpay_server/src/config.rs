use std::env;

use chrono::Duration;
use log::*;
use spg_common::helpers::parse_boolean_flag;
use splitpay_engine::helpers::SplitConfig;
use stripe_tools::StripeConfig;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8480;
const DEFAULT_EVENT_RETENTION_HOURS: i64 = 72;
const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Base URL of the merchant frontend, used as the redirect target for hosted card-setup
    /// sessions and onboarding links.
    pub frontend_url: String,
    /// ISO currency code for all charges, transfers and payouts.
    pub currency: String,
    /// The provider/referrer shares applied to every settled charge.
    pub split: SplitConfig,
    /// How long processed webhook event ids are retained before the purge worker removes them.
    /// Must cover the processor's redelivery horizon.
    pub event_retention: Duration,
    /// If false, webhook signature checks are skipped. Only ever disable this in local testing.
    pub signature_checks: bool,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Stripe client configuration
    pub stripe_config: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: String::default(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            split: SplitConfig::default(),
            event_retention: Duration::hours(DEFAULT_EVENT_RETENTION_HOURS),
            signature_checks: true,
            use_x_forwarded_for: false,
            use_forwarded: false,
            stripe_config: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SPG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let frontend_url = env::var("SPG_FRONTEND_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SPG_FRONTEND_URL is not set. Using {DEFAULT_FRONTEND_URL} as default.");
            DEFAULT_FRONTEND_URL.to_string()
        });
        let currency = env::var("SPG_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let split = configure_split();
        let event_retention = env::var("SPG_EVENT_RETENTION_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or_else(|| Duration::hours(DEFAULT_EVENT_RETENTION_HOURS));
        let signature_checks = parse_boolean_flag(env::var("SPG_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🪛️ Webhook signature checks are DISABLED. Never run with this setting in production.");
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("SPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SPG_USE_FORWARDED").ok(), false);
        let stripe_config = StripeConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            frontend_url,
            currency,
            split,
            event_retention,
            signature_checks,
            use_x_forwarded_for,
            use_forwarded,
            stripe_config,
        }
    }
}

/// Reads the split shares from `SPG_PROVIDER_SHARE_BPS` and `SPG_REFERRER_SHARE_BPS`, in basis
/// points. Falls back to the default 70%/10% split if either is missing or the combination is
/// invalid.
fn configure_split() -> SplitConfig {
    let provider = env::var("SPG_PROVIDER_SHARE_BPS").ok().and_then(|s| s.parse::<u32>().ok());
    let referrer = env::var("SPG_REFERRER_SHARE_BPS").ok().and_then(|s| s.parse::<u32>().ok());
    match (provider, referrer) {
        (Some(p), Some(r)) => SplitConfig::new(p, r).unwrap_or_else(|e| {
            error!("🪛️ Invalid split configuration ({e}). Using the default split instead.");
            SplitConfig::default()
        }),
        _ => {
            info!("🪛️ SPG_PROVIDER_SHARE_BPS / SPG_REFERRER_SHARE_BPS not set. Using the default split.");
            SplitConfig::default()
        },
    }
}
