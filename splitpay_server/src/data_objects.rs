use std::fmt::Display;

use serde::{Deserialize, Serialize};
use spg_common::Cents;
use splitpay_engine::db_types::Order;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSetupSessionRequest {
    pub order_id: String,
    /// The total to charge later, in minor currency units
    pub amount_cents: i64,
    pub provider_account_id: String,
    pub referrer_account_id: String,
    /// Overrides the server's configured currency for this order
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSetupSessionResponse {
    pub order: Order,
    pub session_id: String,
    /// The hosted page the customer must be redirected to in order to save their card
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeOrderRequest {
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePayoutRequest {
    pub connected_account_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePayoutResponse {
    pub payout_id: String,
    pub status: String,
    pub amount: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardAccountRequest {
    pub email: String,
    /// Where the processor sends the user if the onboarding link expires
    pub refresh_url: String,
    /// Where the processor sends the user once onboarding is complete
    pub return_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardAccountResponse {
    pub account_id: String,
    /// The hosted onboarding page for the new connected account
    pub onboarding_url: String,
}
