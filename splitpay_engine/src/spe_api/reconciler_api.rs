use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use spg_common::Cents;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, TransferPair},
    events::{PaymentEvent, PaymentEventKind},
    helpers::{money_split, SplitConfig},
    spe_api::{checkout_api::CheckoutApi, errors::ReconcilerError},
    traits::{OrderStore, OrderStoreError, PaymentProcessor, TransferRequest},
};

/// Why an event was acknowledged without any state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The event carried no order correlation metadata, or the order is not in the store.
    /// Orders created out-of-band or already cleaned up are tolerated.
    UnknownOrder,
    /// The session completion had no setup reference to fetch card details from.
    NoSetupReference,
    /// The settlement reference behind the charge is not available yet. Transfers cannot be
    /// routed without it; the claim is returned so a redelivery can complete the settlement.
    SettlementUnavailable,
    /// The order has already moved past the state this event would produce.
    StaleStatus,
    /// An event type the reconciler does not act on.
    UnhandledEventType,
}

/// The result of reconciling one inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventOutcome {
    /// The event id had already been applied; nothing was done.
    Duplicate,
    /// The event was acknowledged without a state change.
    Ignored(IgnoreReason),
    /// Card references were recorded and the order advanced to `CardSaved`.
    CardSaved(Order),
    /// The split was computed, both transfers issued, and the order advanced to
    /// `PaidAndTransferred`.
    Settled(Order),
}

/// `ReconcilerApi` is the event-driven half of the order state machine. It consumes webhook
/// notifications from the remote processor and advances orders through card-saved and settled
/// states.
///
/// Every event is claimed against the idempotency guard before any other work; duplicates
/// short-circuit to [`EventOutcome::Duplicate`]. Business misses (unknown order, stale status,
/// missing settlement reference) are absorbed as [`EventOutcome::Ignored`] so the caller can
/// acknowledge the delivery - they cannot self-resolve, and a processor retry would change
/// nothing. Internal faults release the claim and propagate as errors; the caller must respond
/// with a failure acknowledgment so the processor redelivers.
pub struct ReconcilerApi<B, P> {
    db: B,
    processor: P,
    split_config: SplitConfig,
    currency: String,
}

impl<B, P> Debug for ReconcilerApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi")
    }
}

impl<B, P> ReconcilerApi<B, P> {
    pub fn new(db: B, processor: P, split_config: SplitConfig, currency: String) -> Self {
        Self { db, processor, split_config, currency }
    }
}

impl<B, P> ReconcilerApi<B, P>
where
    B: OrderStore,
    P: PaymentProcessor,
{
    pub async fn process_event(&self, event: PaymentEvent) -> Result<EventOutcome, ReconcilerError> {
        let event_id = event.event_id.clone();
        if !self.db.claim_event(&event_id).await? {
            debug!("🔁️ Event {event_id} has already been processed. Skipping");
            return Ok(EventOutcome::Duplicate);
        }
        let result = match event.kind {
            PaymentEventKind::CardSetupCompleted { order_id, setup_ref } => {
                self.on_card_setup_completed(order_id, setup_ref).await
            },
            PaymentEventKind::ChargeSucceeded { order_id, payment_intent_id, amount, transfer_group } => {
                self.on_charge_succeeded(order_id, payment_intent_id, amount, transfer_group).await
            },
            PaymentEventKind::Other { event_type } => {
                trace!("🔁️ Ignoring event {event_id} of type {event_type}");
                Ok(EventOutcome::Ignored(IgnoreReason::UnhandledEventType))
            },
        };
        match result {
            // The settlement reference can become available later; return the claim so a
            // redelivery is not short-circuited as a duplicate.
            Ok(EventOutcome::Ignored(IgnoreReason::SettlementUnavailable)) => {
                self.return_claim(&event_id).await;
                Ok(EventOutcome::Ignored(IgnoreReason::SettlementUnavailable))
            },
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // The effect was not applied. Release the claim so the processor's redelivery
                // gets a fresh attempt instead of a duplicate short-circuit.
                warn!("🔁️ Event {event_id} failed to process and will be retried on redelivery. {e}");
                self.return_claim(&event_id).await;
                Err(e)
            },
        }
    }

    async fn return_claim(&self, event_id: &str) {
        if let Err(e) = self.db.release_event(event_id).await {
            error!("🔁️ Could not release the claim on event {event_id}. A redelivery will be treated as a duplicate. {e}");
        }
    }

    /// A card-setup session completed. Fetch the confirmation and record the saved card
    /// references against the correlated order.
    async fn on_card_setup_completed(
        &self,
        order_id: Option<OrderId>,
        setup_ref: Option<String>,
    ) -> Result<EventOutcome, ReconcilerError> {
        let Some(order_id) = order_id else {
            debug!("🔁️ Card-setup completion without order correlation metadata. Acknowledging");
            return Ok(EventOutcome::Ignored(IgnoreReason::UnknownOrder));
        };
        if self.db.fetch_order(&order_id).await?.is_none() {
            debug!("🔁️ Card-setup completion for unknown order {order_id}. Acknowledging");
            return Ok(EventOutcome::Ignored(IgnoreReason::UnknownOrder));
        }
        let Some(setup_ref) = setup_ref else {
            debug!("🔁️ Card-setup completion for order {order_id} carries no setup reference. Acknowledging");
            return Ok(EventOutcome::Ignored(IgnoreReason::NoSetupReference));
        };
        let confirmation = self.processor.retrieve_setup_confirmation(&setup_ref).await?;
        match self
            .db
            .record_card_saved(&order_id, &confirmation.customer_id, &confirmation.payment_method_id)
            .await
        {
            Ok(order) => {
                info!("🔁️ Card saved for order {order_id} (customer {})", confirmation.customer_id);
                Ok(EventOutcome::CardSaved(order))
            },
            Err(OrderStoreError::IllegalStatusChange { from, to, .. }) => {
                debug!("🔁️ Order {order_id} is already {from}; ignoring stale card-saved transition to {to}");
                Ok(EventOutcome::Ignored(IgnoreReason::StaleStatus))
            },
            Err(e) => Err(e.into()),
        }
    }

    /// An off-session charge succeeded. Compute the split on the charged amount, issue the
    /// provider and referrer transfers against the settlement reference, and record the result.
    async fn on_charge_succeeded(
        &self,
        order_id: Option<OrderId>,
        payment_intent_id: String,
        amount: Cents,
        transfer_group: Option<String>,
    ) -> Result<EventOutcome, ReconcilerError> {
        let Some(order_id) = order_id else {
            debug!("🔁️ Charge {payment_intent_id} succeeded without order correlation metadata. Acknowledging");
            return Ok(EventOutcome::Ignored(IgnoreReason::UnknownOrder));
        };
        let Some(order) = self.db.fetch_order(&order_id).await? else {
            debug!("🔁️ Charge {payment_intent_id} succeeded for unknown order {order_id}. Acknowledging");
            return Ok(EventOutcome::Ignored(IgnoreReason::UnknownOrder));
        };
        // No transfer may be issued unless the settlement transition can still be recorded.
        if !order.status.can_transition_to(&OrderStatusType::PaidAndTransferred) {
            debug!("🔁️ Order {order_id} is {} and cannot settle. Acknowledging charge event", order.status);
            return Ok(EventOutcome::Ignored(IgnoreReason::StaleStatus));
        }
        let split = money_split(amount, &self.split_config)?;
        let Some(settlement_ref) = self.processor.fetch_settlement_reference(&payment_intent_id).await? else {
            // Transfers with a source transaction need the charge record, which may lag the
            // success notification.
            info!("🔁️ No settlement reference available yet for {payment_intent_id}. Acknowledging");
            return Ok(EventOutcome::Ignored(IgnoreReason::SettlementUnavailable));
        };
        let transfer_group =
            transfer_group.unwrap_or_else(|| CheckoutApi::<B, P>::transfer_group(&order_id));
        let provider = self
            .issue_transfer(&order.provider_account_id, split.provider, &transfer_group, &settlement_ref, &payment_intent_id, "provider")
            .await?;
        let referrer = self
            .issue_transfer(&order.referrer_account_id, split.referrer, &transfer_group, &settlement_ref, &payment_intent_id, "referrer")
            .await?;
        let transfers = TransferPair { provider_transfer_id: provider, referrer_transfer_id: referrer };
        match self.db.record_settlement(&order_id, &payment_intent_id, split, transfers).await {
            Ok(order) => {
                info!("🔁️ Order {order_id} settled. Split: {split}");
                Ok(EventOutcome::Settled(order))
            },
            Err(OrderStoreError::IllegalStatusChange { from, to, .. }) => {
                debug!("🔁️ Order {order_id} is already {from}; ignoring stale settlement transition to {to}");
                Ok(EventOutcome::Ignored(IgnoreReason::StaleStatus))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn issue_transfer(
        &self,
        destination: &str,
        amount: Cents,
        transfer_group: &str,
        settlement_ref: &str,
        payment_intent_id: &str,
        leg: &str,
    ) -> Result<String, ReconcilerError> {
        // The key is stable across redeliveries, so if the second leg fails and the claim is
        // released, the retried first leg deduplicates at the processor instead of moving funds
        // twice.
        let request = TransferRequest {
            destination_account_id: destination.to_string(),
            amount,
            currency: self.currency.clone(),
            transfer_group: transfer_group.to_string(),
            settlement_ref: settlement_ref.to_string(),
            payment_intent_id: payment_intent_id.to_string(),
            idempotency_key: format!("{transfer_group}-{leg}"),
        };
        let receipt = self.processor.create_transfer(&request).await?;
        debug!("🔁️ Transferred {amount} to {destination} ({})", receipt.transfer_id);
        Ok(receipt.transfer_id)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
