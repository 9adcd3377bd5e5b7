use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, SplitAmounts, TransferPair},
    traits::OrderStoreError,
};

// The mutations below use `RETURNING *` and must be drained with `fetch_all`, never
// `fetch_one`/`fetch_optional`. A statement dropped after its first row is finalized
// asynchronously on the sqlite worker, and until then its implicit transaction is uncommitted,
// so an immediate read on another pooled connection can miss the write.

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// Orders always start in `Created` status. A unique violation on `order_id` is reported as
/// [`OrderStoreError::DuplicateOrder`].
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let order_id = order.order_id.clone();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                amount,
                currency,
                provider_account_id,
                referrer_account_id,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, 'Created', $6, $6)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.amount)
    .bind(order.currency)
    .bind(order.provider_account_id)
    .bind(order.referrer_account_id)
    .bind(order.created_at)
    .fetch_all(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => OrderStoreError::DuplicateOrder(order_id.clone()),
        _ => OrderStoreError::from(e),
    })?
    .pop()
    .ok_or_else(|| OrderStoreError::DatabaseError(format!("Insert of order {order_id} returned no row")))?;
    debug!("📝️ Order {} inserted with id {}", order.order_id, order.id);
    Ok(order)
}

/// Returns the entry in the orders table for the corresponding `order_id`
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Records the card references from a setup confirmation and moves the order to `CardSaved` in a single guarded
/// statement. The status guard makes the transition idempotent-safe under concurrent deliveries: only an order
/// still in `Created` is updated, so both fields are written exactly once and together.
pub async fn card_saved(
    order_id: &OrderId,
    customer_id: &str,
    payment_method_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'CardSaved',
                customer_id = $2,
                payment_method_id = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'Created'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(customer_id)
    .bind(payment_method_id)
    .fetch_all(&mut *conn)
    .await?
    .pop();
    match order {
        Some(order) => Ok(order),
        None => Err(transition_miss(order_id, OrderStatusType::CardSaved, conn).await),
    }
}

/// Records a submitted charge and moves the order to `ChargeAttempted`. Allowed from `CardSaved` (the normal path)
/// and from `ChargeRequiresAction` (a manual retry after customer authentication).
pub async fn charge_attempted(
    order_id: &OrderId,
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'ChargeAttempted',
                payment_intent_id = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status IN ('CardSaved', 'ChargeRequiresAction')
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(payment_intent_id)
    .fetch_all(&mut *conn)
    .await?
    .pop();
    match order {
        Some(order) => Ok(order),
        None => Err(transition_miss(order_id, OrderStatusType::ChargeAttempted, conn).await),
    }
}

/// Parks the order in `ChargeRequiresAction` after the processor demanded additional customer authentication.
pub async fn requires_action(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'ChargeRequiresAction',
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status IN ('CardSaved', 'ChargeAttempted')
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_all(&mut *conn)
    .await?
    .pop();
    match order {
        Some(order) => Ok(order),
        None => Err(transition_miss(order_id, OrderStatusType::ChargeRequiresAction, conn).await),
    }
}

/// Moves the order to the terminal `Failed` status after a non-recoverable charge failure.
/// `CardSaved` is an accepted source status because a decline can arrive synchronously, before
/// any charge attempt was recorded.
pub async fn failed(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'Failed',
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status IN ('CardSaved', 'ChargeAttempted', 'ChargeRequiresAction')
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_all(&mut *conn)
    .await?
    .pop();
    match order {
        Some(order) => Ok(order),
        None => Err(transition_miss(order_id, OrderStatusType::Failed, conn).await),
    }
}

/// Records the settled split and both transfer ids, and moves the order to `PaidAndTransferred`.
///
/// The `provider_transfer_id IS NULL` guard makes the settlement write-once: once a pair of transfer ids has been
/// recorded it can never be overwritten, no matter how an event is redelivered. `CardSaved` is an accepted source
/// status because the processor's success notification can race the synchronous charge call, and
/// `ChargeRequiresAction` because a parked charge succeeds once the customer authenticates it.
pub async fn settled(
    order_id: &OrderId,
    payment_intent_id: &str,
    split: SplitAmounts,
    transfers: TransferPair,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'PaidAndTransferred',
                payment_intent_id = $2,
                provider_transfer_id = $3,
                referrer_transfer_id = $4,
                provider_amount = $5,
                referrer_amount = $6,
                platform_amount = $7,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1
              AND status IN ('CardSaved', 'ChargeAttempted', 'ChargeRequiresAction')
              AND provider_transfer_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(payment_intent_id)
    .bind(transfers.provider_transfer_id)
    .bind(transfers.referrer_transfer_id)
    .bind(split.provider)
    .bind(split.referrer)
    .bind(split.platform)
    .fetch_all(&mut *conn)
    .await?
    .pop();
    match order {
        Some(order) => Ok(order),
        None => Err(transition_miss(order_id, OrderStatusType::PaidAndTransferred, conn).await),
    }
}

/// A guarded update matched no row. Disambiguates between a missing order and an illegal status change by
/// re-fetching the order.
async fn transition_miss(order_id: &OrderId, to: OrderStatusType, conn: &mut SqliteConnection) -> OrderStoreError {
    match fetch_order_by_order_id(order_id, conn).await {
        Ok(Some(order)) => {
            OrderStoreError::IllegalStatusChange { order_id: order_id.clone(), from: order.status, to }
        },
        Ok(None) => OrderStoreError::OrderNotFound(order_id.clone()),
        Err(e) => OrderStoreError::from(e),
    }
}
