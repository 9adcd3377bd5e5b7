use chrono::Duration;
use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType, SplitAmounts, TransferPair};

/// The durable order store and processed-event idempotency guard.
///
/// This is the only mutable shared state in the system. Every mutation is a guarded,
/// single-statement transition: implementations must guarantee that two concurrent mutations on
/// the same `order_id` serialize, and that a transition observed as applied is never lost or
/// interleaved with another. Status never regresses; the allowed moves are defined by
/// [`OrderStatusType::can_transition_to`].
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    /// Persist a brand-new order in `Created` status.
    ///
    /// Fails with [`OrderStoreError::DuplicateOrder`] if an order with the same `order_id`
    /// already exists.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    /// Fetch the order with the given id, or `None` if it does not exist.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    /// Record the card references from a setup confirmation and advance the order to
    /// `CardSaved`.
    ///
    /// `customer_id` and `payment_method_id` are written in the same statement as the status
    /// change, so the both-or-neither invariant always holds.
    async fn record_card_saved(
        &self,
        order_id: &OrderId,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<Order, OrderStoreError>;

    /// Record a submitted off-session charge and advance the order to `ChargeAttempted`.
    async fn record_charge_attempt(&self, order_id: &OrderId, payment_intent_id: &str)
        -> Result<Order, OrderStoreError>;

    /// Park the order in `ChargeRequiresAction` after the processor demanded additional
    /// customer authentication.
    async fn mark_requires_action(&self, order_id: &OrderId) -> Result<Order, OrderStoreError>;

    /// Move the order to the terminal `Failed` status after a non-recoverable charge failure.
    async fn mark_failed(&self, order_id: &OrderId) -> Result<Order, OrderStoreError>;

    /// Record the settled split and both transfer ids, and advance the order to
    /// `PaidAndTransferred`.
    ///
    /// The split and transfer ids are write-once: the guarded update only applies while the
    /// order has not settled, so at most one pair of transfers is ever recorded per order.
    async fn record_settlement(
        &self,
        order_id: &OrderId,
        payment_intent_id: &str,
        split: SplitAmounts,
        transfers: TransferPair,
    ) -> Result<Order, OrderStoreError>;

    /// Claim an inbound event id. Returns `true` exactly once per id: the first caller wins,
    /// every subsequent claim of the same id returns `false`.
    ///
    /// The check-and-record is atomic with respect to concurrent deliveries of the same id.
    async fn claim_event(&self, event_id: &str) -> Result<bool, OrderStoreError>;

    /// Return a previously claimed event id so a later redelivery can be processed. Used when
    /// event processing failed after the claim and the effect has not been applied.
    async fn release_event(&self, event_id: &str) -> Result<(), OrderStoreError>;

    /// Delete processed-event records older than `older_than`. Returns the number of records
    /// removed. The retention window should cover the processor's redelivery horizon.
    async fn purge_processed_events(&self, older_than: Duration) -> Result<u64, OrderStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    DuplicateOrder(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    IllegalStatusChange { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
