use chrono::{Duration, Utc};
use mockall::mock;
use spg_common::Cents;
use splitpay_engine::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, SplitAmounts, TransferPair},
    traits::{
        ChargeSubmission,
        OffSessionChargeRequest,
        OrderStore,
        OrderStoreError,
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

mock! {
    pub OrderStoreDb {}
    impl Clone for OrderStoreDb {
        fn clone(&self) -> Self;
    }
    impl OrderStore for OrderStoreDb {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn record_card_saved(&self, order_id: &OrderId, customer_id: &str, payment_method_id: &str) -> Result<Order, OrderStoreError>;
        async fn record_charge_attempt(&self, order_id: &OrderId, payment_intent_id: &str) -> Result<Order, OrderStoreError>;
        async fn mark_requires_action(&self, order_id: &OrderId) -> Result<Order, OrderStoreError>;
        async fn mark_failed(&self, order_id: &OrderId) -> Result<Order, OrderStoreError>;
        async fn record_settlement(&self, order_id: &OrderId, payment_intent_id: &str, split: SplitAmounts, transfers: TransferPair) -> Result<Order, OrderStoreError>;
        async fn claim_event(&self, event_id: &str) -> Result<bool, OrderStoreError>;
        async fn release_event(&self, event_id: &str) -> Result<(), OrderStoreError>;
        async fn purge_processed_events(&self, older_than: Duration) -> Result<u64, OrderStoreError>;
    }
}

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn create_setup_session(&self, request: &SetupSessionRequest) -> Result<SetupSession, ProcessorError>;
        async fn retrieve_setup_confirmation(&self, setup_ref: &str) -> Result<SetupConfirmation, ProcessorError>;
        async fn charge_off_session(&self, request: &OffSessionChargeRequest) -> Result<ChargeSubmission, ProcessorError>;
        async fn fetch_settlement_reference(&self, payment_intent_id: &str) -> Result<Option<String>, ProcessorError>;
        async fn create_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ProcessorError>;
        async fn available_balance(&self, account_id: &str, currency: &str) -> Result<Cents, ProcessorError>;
        async fn create_payout(&self, account_id: &str, amount: Cents, currency: &str) -> Result<PayoutReceipt, ProcessorError>;
    }
}

/// A fully populated order fixture in the given status.
pub fn order_fixture(order_id: &str, status: OrderStatusType) -> Order {
    let card_saved = !matches!(status, OrderStatusType::Created);
    Order {
        id: 1,
        order_id: OrderId(order_id.into()),
        amount: Cents::from(10_000),
        currency: "usd".to_string(),
        provider_account_id: "acct_provider".to_string(),
        referrer_account_id: "acct_referrer".to_string(),
        status,
        customer_id: card_saved.then(|| "cus_1".to_string()),
        payment_method_id: card_saved.then(|| "pm_1".to_string()),
        payment_intent_id: None,
        provider_transfer_id: None,
        referrer_transfer_id: None,
        provider_amount: None,
        referrer_amount: None,
        platform_amount: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
