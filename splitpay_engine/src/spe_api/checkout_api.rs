use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use spg_common::Cents;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    spe_api::errors::CheckoutError,
    traits::{
        OffSessionChargeRequest,
        OrderStore,
        PaymentProcessor,
        PayoutReceipt,
        ProcessorError,
        SetupSession,
        SetupSessionRequest,
    },
};

/// Settings the orchestrator needs to build processor requests. Loaded once at process start,
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// ISO currency code for all charges, transfers and payouts.
    pub currency: String,
    /// Base URL of the merchant frontend, used for the hosted session redirect targets.
    pub frontend_url: String,
}

/// The result of creating a setup session: the persisted order and the hosted session the
/// customer must be redirected to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSetupSession {
    pub order: Order,
    pub session: SetupSession,
}

/// `CheckoutApi` is the request-driven half of the order state machine. It creates card-setup
/// sessions, triggers delayed off-session charges, and issues manual payouts.
pub struct CheckoutApi<B, P> {
    db: B,
    processor: P,
    config: CheckoutConfig,
}

impl<B, P> Debug for CheckoutApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, P> CheckoutApi<B, P> {
    pub fn new(db: B, processor: P, config: CheckoutConfig) -> Self {
        Self { db, processor, config }
    }

    /// The correlation id grouping an order's charge with its downstream transfers.
    pub fn transfer_group(order_id: &OrderId) -> String {
        format!("ORDER_{}", order_id.as_str())
    }
}

impl<B, P> CheckoutApi<B, P>
where
    B: OrderStore,
    P: PaymentProcessor,
{
    /// Start the delayed-charge flow for a new order.
    ///
    /// Persists the order in `Created` status, then requests a card-collection session from the
    /// processor in "save card, no charge" mode, tagged with the order id so the completion
    /// webhook can be correlated back. Returns the session redirect URL.
    ///
    /// Fails with [`CheckoutError::OrderAlreadyExists`] if the order id is already known.
    pub async fn create_setup_session(&self, order: NewOrder) -> Result<NewSetupSession, CheckoutError> {
        let order = self.db.insert_order(order).await?;
        debug!("🛒️ Order {} stored. Requesting card-setup session", order.order_id);
        let request = SetupSessionRequest {
            order_id: order.order_id.clone(),
            currency: self.config.currency.clone(),
            success_url: format!("{}/pay/success?session_id={{CHECKOUT_SESSION_ID}}", self.config.frontend_url),
            cancel_url: format!("{}/pay/cancel", self.config.frontend_url),
        };
        let session = self.processor.create_setup_session(&request).await?;
        info!("🛒️ Card-setup session {} created for order {}", session.session_id, order.order_id);
        Ok(NewSetupSession { order, session })
    }

    /// Charge a saved card off-session. Typically called on the service date by a scheduled job
    /// or a manual trigger.
    ///
    /// Idempotent: an order that has already been charged (or has settled, or has failed) is
    /// returned as-is without contacting the processor. Orders whose card has not been saved
    /// yet fail with [`CheckoutError::CardNotSaved`].
    ///
    /// If the processor demands additional customer authentication, the order is parked in
    /// `ChargeRequiresAction` and the error is surfaced as recoverable; the call may be retried
    /// once the customer has authenticated. A declined card moves the order to the terminal
    /// `Failed` status.
    pub async fn charge_order_now(&self, order_id: &OrderId) -> Result<Order, CheckoutError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
        match order.status {
            OrderStatusType::ChargeAttempted | OrderStatusType::PaidAndTransferred | OrderStatusType::Failed => {
                debug!("🛒️ Order {order_id} is already {} - not charging again", order.status);
                return Ok(order);
            },
            OrderStatusType::Created => return Err(CheckoutError::CardNotSaved(order_id.clone())),
            OrderStatusType::CardSaved | OrderStatusType::ChargeRequiresAction => {},
        }
        let (Some(customer_id), Some(payment_method_id)) = (order.customer_id, order.payment_method_id) else {
            return Err(CheckoutError::CardNotSaved(order_id.clone()));
        };
        let request = OffSessionChargeRequest {
            order_id: order_id.clone(),
            amount: order.amount,
            currency: self.config.currency.clone(),
            customer_id,
            payment_method_id,
            transfer_group: Self::transfer_group(order_id),
        };
        debug!("🛒️ Submitting off-session charge of {} for order {order_id}", order.amount);
        match self.processor.charge_off_session(&request).await {
            Ok(submission) => {
                let order = self.db.record_charge_attempt(order_id, &submission.payment_intent_id).await?;
                info!(
                    "🛒️ Off-session charge {} submitted for order {order_id} ({})",
                    submission.payment_intent_id, submission.status
                );
                Ok(order)
            },
            Err(ProcessorError::AuthenticationRequired { payment_intent_id, message }) => {
                warn!("🛒️ Order {order_id} requires customer authentication. {message}");
                if let Some(pi) = payment_intent_id {
                    self.db.record_charge_attempt(order_id, &pi).await?;
                }
                self.db.mark_requires_action(order_id).await?;
                Err(CheckoutError::AuthenticationRequired { order_id: order_id.clone(), message })
            },
            Err(ProcessorError::CardDeclined(message)) => {
                warn!("🛒️ Card declined for order {order_id}. {message}");
                self.db.mark_failed(order_id).await?;
                Err(ProcessorError::CardDeclined(message).into())
            },
            Err(e) => {
                // Transient processor failure. The order status is untouched so the caller can
                // retry.
                warn!("🛒️ Charge submission for order {order_id} failed. {e}");
                Err(e.into())
            },
        }
    }

    /// Release money from a connected sub-account's available balance to its bank destination.
    ///
    /// Checks the available balance first and fails with
    /// [`CheckoutError::InsufficientBalance`] without issuing the payout when the request
    /// exceeds it. This operation never touches the order store.
    pub async fn release_payout(&self, account_id: &str, amount: Cents) -> Result<PayoutReceipt, CheckoutError> {
        let available = self.processor.available_balance(account_id, &self.config.currency).await?;
        if available < amount {
            info!("🛒️ Payout of {amount} from {account_id} denied. Only {available} available");
            return Err(CheckoutError::InsufficientBalance { available, requested: amount });
        }
        let receipt = self.processor.create_payout(account_id, amount, &self.config.currency).await?;
        info!("🛒️ Payout {} of {amount} from {account_id} created ({})", receipt.payout_id, receipt.status);
        Ok(receipt)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
