use std::{collections::HashMap, fmt::Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The structured error object Stripe returns on failed requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Present on card errors raised by a payment intent, e.g. `authentication_required`.
    #[serde(default)]
    pub payment_intent: Option<PaymentIntentRef>,
}

impl Display for StripeErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code.as_deref().unwrap_or("-");
        let message = self.message.as_deref().unwrap_or("no message");
        write!(f, "[{} / {code}] {message}", self.error_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentRef {
    pub id: String,
}

/// A hosted checkout session. In setup mode, `setup_intent` references the intent holding the
/// saved card once the session completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub setup_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// `latest_charge` is a bare id unless the intent was retrieved with `expand[]=latest_charge`,
/// in which case it is the full charge object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChargeRef {
    Id(String),
    Object { id: String },
}

impl ChargeRef {
    pub fn id(&self) -> &str {
        match self {
            ChargeRef::Id(id) => id,
            ChargeRef::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub latest_charge: Option<ChargeRef>,
    #[serde(default)]
    pub transfer_group: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceFunds {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default)]
    pub available: Vec<BalanceFunds>,
    #[serde(default)]
    pub pending: Vec<BalanceFunds>,
}

impl Balance {
    /// The available amount for the given currency, in minor units. Currencies with no entry
    /// have a zero balance.
    pub fn available_for(&self, currency: &str) -> i64 {
        self.available.iter().filter(|f| f.currency.eq_ignore_ascii_case(currency)).map(|f| f.amount).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub id: String,
    pub status: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLink {
    pub url: String,
}

/// The webhook envelope. `data.object` is kept raw; the server decodes it based on `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}
