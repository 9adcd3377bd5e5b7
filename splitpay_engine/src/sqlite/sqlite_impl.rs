use chrono::Duration;
use log::trace;
use sqlx::SqlitePool;

use crate::{
    db_types::{NewOrder, Order, OrderId, SplitAmounts, TransferPair},
    sqlite::db::{db_url, events, new_pool, orders},
    traits::{OrderStore, OrderStoreError},
};

/// The SQLite implementation of the order store. Cheap to clone; clones share the underlying
/// connection pool.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl OrderStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn record_card_saved(
        &self,
        order_id: &OrderId,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::card_saved(order_id, customer_id, payment_method_id, &mut conn).await
    }

    async fn record_charge_attempt(
        &self,
        order_id: &OrderId,
        payment_intent_id: &str,
    ) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::charge_attempted(order_id, payment_intent_id, &mut conn).await
    }

    async fn mark_requires_action(&self, order_id: &OrderId) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::requires_action(order_id, &mut conn).await
    }

    async fn mark_failed(&self, order_id: &OrderId) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::failed(order_id, &mut conn).await
    }

    async fn record_settlement(
        &self,
        order_id: &OrderId,
        payment_intent_id: &str,
        split: SplitAmounts,
        transfers: TransferPair,
    ) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::settled(order_id, payment_intent_id, split, transfers, &mut conn).await
    }

    async fn claim_event(&self, event_id: &str) -> Result<bool, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let claimed = events::claim_event(event_id, &mut conn).await?;
        Ok(claimed)
    }

    async fn release_event(&self, event_id: &str) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        events::release_event(event_id, &mut conn).await?;
        Ok(())
    }

    async fn purge_processed_events(&self, older_than: Duration) -> Result<u64, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let purged = events::purge_events_older_than(older_than, &mut conn).await?;
        Ok(purged)
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
