//! The Stripe implementation of the engine's [`PaymentProcessor`] contract, plus the decoding of
//! raw webhook envelopes into engine events.
use log::*;
use spg_common::Cents;
use splitpay_engine::{
    db_types::OrderId,
    events::{PaymentEvent, PaymentEventKind},
    traits::{
        ChargeSubmission,
        OffSessionChargeRequest,
        PaymentProcessor,
        PayoutReceipt,
        ProcessorError,
        SetupConfirmation,
        SetupSession,
        SetupSessionRequest,
        TransferReceipt,
        TransferRequest,
    },
};
use stripe_tools::{CheckoutSession, StripeApi, StripeApiError, StripeEvent, StripePaymentIntent};

/// Wraps the low-level Stripe client behind the engine's processor contract. Cheap to clone.
#[derive(Clone)]
pub struct StripeProcessor {
    api: StripeApi,
}

impl StripeProcessor {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &StripeApi {
        &self.api
    }
}

impl PaymentProcessor for StripeProcessor {
    async fn create_setup_session(&self, request: &SetupSessionRequest) -> Result<SetupSession, ProcessorError> {
        let session = self
            .api
            .create_setup_checkout_session(request.order_id.as_str(), &request.success_url, &request.cancel_url)
            .await
            .map_err(convert_error)?;
        let url = session
            .url
            .ok_or_else(|| ProcessorError::Remote("Checkout session was created without a redirect URL".into()))?;
        Ok(SetupSession { session_id: session.id, url })
    }

    async fn retrieve_setup_confirmation(&self, setup_ref: &str) -> Result<SetupConfirmation, ProcessorError> {
        let intent = self.api.retrieve_setup_intent(setup_ref).await.map_err(convert_error)?;
        let (Some(customer_id), Some(payment_method_id)) = (intent.customer, intent.payment_method) else {
            return Err(ProcessorError::Remote(format!(
                "Setup intent {setup_ref} has no customer or payment method attached"
            )));
        };
        Ok(SetupConfirmation { customer_id, payment_method_id })
    }

    async fn charge_off_session(
        &self,
        request: &OffSessionChargeRequest,
    ) -> Result<ChargeSubmission, ProcessorError> {
        let intent = self
            .api
            .create_off_session_payment_intent(
                request.order_id.as_str(),
                request.amount.value(),
                &request.currency,
                &request.customer_id,
                &request.payment_method_id,
                &request.transfer_group,
            )
            .await
            .map_err(convert_error)?;
        Ok(ChargeSubmission {
            payment_intent_id: intent.id,
            status: intent.status,
            amount: Cents::from(intent.amount),
        })
    }

    async fn fetch_settlement_reference(&self, payment_intent_id: &str) -> Result<Option<String>, ProcessorError> {
        let intent = self.api.retrieve_payment_intent(payment_intent_id).await.map_err(convert_error)?;
        Ok(intent.latest_charge.map(|c| c.id().to_string()))
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ProcessorError> {
        let transfer = self
            .api
            .create_transfer(
                &request.destination_account_id,
                request.amount.value(),
                &request.currency,
                &request.transfer_group,
                &request.settlement_ref,
                &request.payment_intent_id,
                &request.idempotency_key,
            )
            .await
            .map_err(convert_error)?;
        Ok(TransferReceipt { transfer_id: transfer.id })
    }

    async fn available_balance(&self, account_id: &str, currency: &str) -> Result<Cents, ProcessorError> {
        let balance = self.api.retrieve_balance(account_id).await.map_err(convert_error)?;
        Ok(Cents::from(balance.available_for(currency)))
    }

    async fn create_payout(
        &self,
        account_id: &str,
        amount: Cents,
        currency: &str,
    ) -> Result<PayoutReceipt, ProcessorError> {
        let payout = self.api.create_payout(account_id, amount.value(), currency).await.map_err(convert_error)?;
        Ok(PayoutReceipt { payout_id: payout.id, status: payout.status })
    }
}

/// Maps a Stripe error to the engine's processor error taxonomy. `authentication_required` and
/// card errors get their own variants so the checkout flow can park or fail the order; everything
/// else is an opaque remote failure.
fn convert_error(e: StripeApiError) -> ProcessorError {
    if let Some(detail) = e.detail() {
        let message = detail.message.clone().unwrap_or_else(|| detail.to_string());
        if detail.code.as_deref() == Some("authentication_required") {
            let payment_intent_id = detail.payment_intent.as_ref().map(|p| p.id.clone());
            return ProcessorError::AuthenticationRequired { payment_intent_id, message };
        }
        if detail.error_type == "card_error" {
            return ProcessorError::CardDeclined(message);
        }
    }
    ProcessorError::Remote(e.to_string())
}

/// Decodes a raw webhook envelope into an engine event.
///
/// `checkout.session.completed` is only meaningful in setup mode; completed payment-mode sessions
/// fall through to [`PaymentEventKind::Other`]. Unknown event types do too, so the reconciler can
/// acknowledge them without any state change.
pub fn decode_event(event: StripeEvent) -> Result<PaymentEvent, serde_json::Error> {
    let kind = match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object)?;
            if session.mode == "setup" {
                let order_id = session.metadata.get("order_id").cloned().map(OrderId::from);
                PaymentEventKind::CardSetupCompleted { order_id, setup_ref: session.setup_intent }
            } else {
                trace!("🔁️ Completed checkout session {} is not in setup mode", session.id);
                PaymentEventKind::Other { event_type: event.event_type }
            }
        },
        "payment_intent.succeeded" => {
            let intent: StripePaymentIntent = serde_json::from_value(event.data.object)?;
            let order_id = intent.metadata.get("order_id").cloned().map(OrderId::from);
            PaymentEventKind::ChargeSucceeded {
                order_id,
                payment_intent_id: intent.id,
                amount: Cents::from(intent.amount),
                transfer_group: intent.transfer_group,
            }
        },
        _ => PaymentEventKind::Other { event_type: event.event_type },
    };
    Ok(PaymentEvent::new(event.id, kind))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_setup_session_completion() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "mode": "setup",
                "setup_intent": "seti_1",
                "metadata": { "order_id": "ord_1" }
            }}
        }))
        .unwrap();
        let event = decode_event(event).unwrap();
        assert_eq!(event.event_id, "evt_1");
        let PaymentEventKind::CardSetupCompleted { order_id, setup_ref } = event.kind else {
            panic!("wrong kind")
        };
        assert_eq!(order_id, Some(OrderId::from("ord_1".to_string())));
        assert_eq!(setup_ref.as_deref(), Some("seti_1"));
    }

    #[test]
    fn payment_mode_session_completion_is_other() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "mode": "payment" } }
        }))
        .unwrap();
        let event = decode_event(event).unwrap();
        assert!(matches!(event.kind, PaymentEventKind::Other { .. }));
    }

    #[test]
    fn decodes_charge_success() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_2",
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_1",
                "status": "succeeded",
                "amount": 10000,
                "currency": "usd",
                "transfer_group": "ORDER_ord_1",
                "metadata": { "order_id": "ord_1" }
            }}
        }))
        .unwrap();
        let event = decode_event(event).unwrap();
        let PaymentEventKind::ChargeSucceeded { order_id, payment_intent_id, amount, transfer_group } = event.kind
        else {
            panic!("wrong kind")
        };
        assert_eq!(order_id, Some(OrderId::from("ord_1".to_string())));
        assert_eq!(payment_intent_id, "pi_1");
        assert_eq!(amount, Cents::from(10_000));
        assert_eq!(transfer_group.as_deref(), Some("ORDER_ord_1"));
    }

    #[test]
    fn unknown_event_types_pass_through() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_3",
            "type": "invoice.created",
            "data": { "object": {} }
        }))
        .unwrap();
        let event = decode_event(event).unwrap();
        let PaymentEventKind::Other { event_type } = event.kind else { panic!("wrong kind") };
        assert_eq!(event_type, "invoice.created");
    }
}
