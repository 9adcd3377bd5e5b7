//! Decoded inbound processor events.
//!
//! The raw webhook envelope is decoded exactly once, at the server boundary, into the
//! [`PaymentEventKind`] sum type. The reconciler dispatches on the variant rather than on string
//! tags, so unknown event types fall through to [`PaymentEventKind::Other`] and are acknowledged
//! without touching any state.
use serde::{Deserialize, Serialize};
use spg_common::Cents;

use crate::db_types::OrderId;

/// A single webhook delivery from the remote processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// The processor-assigned event id. Used for idempotent, at-most-once-effect processing:
    /// deliveries are at-least-once, so the same id may arrive more than once.
    pub event_id: String,
    pub kind: PaymentEventKind,
}

impl PaymentEvent {
    pub fn new<S: Into<String>>(event_id: S, kind: PaymentEventKind) -> Self {
        Self { event_id: event_id.into(), kind }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentEventKind {
    /// A card-setup session completed: the customer's card has been collected and saved.
    CardSetupCompleted {
        /// Correlation metadata from the session. Absent when the session was created
        /// out-of-band.
        order_id: Option<OrderId>,
        /// Reference to the setup confirmation holding the customer and payment method ids.
        setup_ref: Option<String>,
    },
    /// An off-session charge succeeded and funds are ready to be split and transferred.
    ChargeSucceeded {
        order_id: Option<OrderId>,
        payment_intent_id: String,
        /// The amount actually charged. The split is computed on this, not on the stored order
        /// amount.
        amount: Cents,
        transfer_group: Option<String>,
    },
    /// Any other event type. Acknowledged and ignored.
    Other { event_type: String },
}
