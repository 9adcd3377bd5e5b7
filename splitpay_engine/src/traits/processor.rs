use serde::{Deserialize, Serialize};
use spg_common::Cents;
use thiserror::Error;

use crate::db_types::OrderId;

/// The boundary to the remote payment processor.
///
/// The engine never constructs HTTP requests itself; it describes what it needs with the request
/// objects below and lets the implementation talk to the wire. The concrete Stripe client lives
/// in the server crate's integrations module; tests use a mockall mock.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    /// Create a hosted card-collection session in "save card, no charge" mode, tagged with the
    /// order id as correlation metadata.
    async fn create_setup_session(&self, request: &SetupSessionRequest) -> Result<SetupSession, ProcessorError>;

    /// Fetch the confirmation for a completed card-setup, yielding the saved customer and
    /// payment method references.
    async fn retrieve_setup_confirmation(&self, setup_ref: &str) -> Result<SetupConfirmation, ProcessorError>;

    /// Submit an off-session charge against a previously saved card.
    async fn charge_off_session(&self, request: &OffSessionChargeRequest)
        -> Result<ChargeSubmission, ProcessorError>;

    /// Fetch the settlement (charge) reference behind a successful payment intent. Returns
    /// `None` when the charge record is not yet available; transfers cannot be routed without
    /// it.
    async fn fetch_settlement_reference(&self, payment_intent_id: &str) -> Result<Option<String>, ProcessorError>;

    /// Move a portion of settled funds to a connected sub-account.
    async fn create_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ProcessorError>;

    /// The currently available balance on a connected sub-account, in the given currency.
    async fn available_balance(&self, account_id: &str, currency: &str) -> Result<Cents, ProcessorError>;

    /// Pay out from a connected sub-account's available balance to its external bank
    /// destination.
    async fn create_payout(&self, account_id: &str, amount: Cents, currency: &str)
        -> Result<PayoutReceipt, ProcessorError>;
}

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("The processor requires additional customer authentication. {message}")]
    AuthenticationRequired { payment_intent_id: Option<String>, message: String },
    #[error("The card was declined. {0}")]
    CardDeclined(String),
    #[error("The payment processor returned an error. {0}")]
    Remote(String),
}

//--------------------------------------  Request / response objects  ------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupSessionRequest {
    pub order_id: OrderId,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// A hosted card-collection session. The customer is redirected to `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupSession {
    pub session_id: String,
    pub url: String,
}

/// The saved card references extracted from a completed setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfirmation {
    pub customer_id: String,
    pub payment_method_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffSessionChargeRequest {
    pub order_id: OrderId,
    pub amount: Cents,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    /// Correlation id grouping the charge with its downstream transfers.
    pub transfer_group: String,
}

/// A charge submitted to the processor. Settlement is confirmed asynchronously via webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeSubmission {
    pub payment_intent_id: String,
    pub status: String,
    pub amount: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub destination_account_id: String,
    pub amount: Cents,
    pub currency: String,
    pub transfer_group: String,
    /// The settlement reference the funds are routed against.
    pub settlement_ref: String,
    /// The charge correlation id, carried as metadata for auditability.
    pub payment_intent_id: String,
    /// Deduplication key for this transfer leg, stable across event redeliveries. The processor
    /// must treat two requests with the same key as one transfer.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub payout_id: String,
    pub status: String,
}
