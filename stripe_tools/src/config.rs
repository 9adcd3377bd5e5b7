use log::*;
use spg_common::Secret;

const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    /// The endpoint secret used to verify webhook signatures.
    pub webhook_secret: Secret<String>,
    pub api_base: String,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let secret_key = Secret::new(std::env::var("SPG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("SPG_STRIPE_SECRET_KEY not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("SPG_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("SPG_STRIPE_WEBHOOK_SECRET not set, using (probably useless) default");
            "whsec_00000000000000".to_string()
        }));
        let api_base = std::env::var("SPG_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self { secret_key, webhook_secret, api_base }
    }
}
