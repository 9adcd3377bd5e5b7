use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::json;
use spg_common::Cents;
use splitpay_engine::{
    db_types::{OrderId, OrderStatusType},
    traits::{OrderStoreError, PayoutReceipt, ProcessorError, SetupSession},
    CheckoutApi,
    CheckoutConfig,
};

use super::{
    helpers::post_request,
    mocks::{order_fixture, MockOrderStoreDb, MockProcessor},
};
use crate::routes::{ChargeOrderRoute, CreateSetupSessionRoute, ReleasePayoutRoute};

fn checkout_config() -> CheckoutConfig {
    CheckoutConfig { currency: "usd".to_string(), frontend_url: "http://localhost:3000".to_string() }
}

fn register(cfg: &mut ServiceConfig, db: MockOrderStoreDb, processor: MockProcessor) {
    let api = CheckoutApi::new(db, processor, checkout_config());
    cfg.service(CreateSetupSessionRoute::<MockOrderStoreDb, MockProcessor>::new())
        .service(ChargeOrderRoute::<MockOrderStoreDb, MockProcessor>::new())
        .service(ReleasePayoutRoute::<MockOrderStoreDb, MockProcessor>::new())
        .app_data(web::Data::new(api));
}

fn setup_session_request() -> serde_json::Value {
    json!({
        "order_id": "ord_1",
        "amount_cents": 10_000,
        "provider_account_id": "acct_provider",
        "referrer_account_id": "acct_referrer",
    })
}

#[actix_web::test]
async fn create_setup_session_returns_redirect_url() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/create-setup-session", setup_session_request(), |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_insert_order().times(1).returning(|_| Ok(order_fixture("ord_1", OrderStatusType::Created)));
        let mut processor = MockProcessor::new();
        processor.expect_create_setup_session().times(1).returning(|_| {
            Ok(SetupSession {
                session_id: "cs_1".to_string(),
                url: "https://checkout.example.com/pay/cs_1".to_string(),
            })
        });
        register(cfg, db, processor);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""session_id":"cs_1""#), "unexpected body: {body}");
    assert!(body.contains(r#""checkout_url":"https://checkout.example.com/pay/cs_1""#), "unexpected body: {body}");
    assert!(body.contains(r#""status":"Created""#), "unexpected body: {body}");
}

#[actix_web::test]
async fn duplicate_order_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/create-setup-session", setup_session_request(), |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_insert_order()
            .times(1)
            .returning(|_| Err(OrderStoreError::DuplicateOrder(OrderId("ord_1".into()))));
        // The processor must never be contacted for a duplicate
        register(cfg, db, MockProcessor::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already exists"), "unexpected body: {body}");
}

#[actix_web::test]
async fn non_positive_amounts_are_rejected() {
    let _ = env_logger::try_init().ok();
    let request = json!({
        "order_id": "ord_1",
        "amount_cents": 0,
        "provider_account_id": "acct_provider",
        "referrer_account_id": "acct_referrer",
    });
    let (status, body) = post_request("/create-setup-session", request, |cfg| {
        register(cfg, MockOrderStoreDb::new(), MockProcessor::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("amount_cents must be positive"), "unexpected body: {body}");
}

#[actix_web::test]
async fn charging_an_unknown_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/charge-order", json!({"order_id": "ghost"}), |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_fetch_order().times(1).returning(|_| Ok(None));
        register(cfg, db, MockProcessor::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("not found"), "unexpected body: {body}");
}

#[actix_web::test]
async fn charging_before_the_card_is_saved_fails_the_precondition() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/charge-order", json!({"order_id": "ord_1"}), |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_fetch_order()
            .times(1)
            .returning(|_| Ok(Some(order_fixture("ord_1", OrderStatusType::Created))));
        register(cfg, db, MockProcessor::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body.contains("has not been saved yet"), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_declined_card_is_payment_required() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/charge-order", json!({"order_id": "ord_1"}), |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_fetch_order()
            .times(1)
            .returning(|_| Ok(Some(order_fixture("ord_1", OrderStatusType::CardSaved))));
        db.expect_mark_failed().times(1).returning(|_| Ok(order_fixture("ord_1", OrderStatusType::Failed)));
        let mut processor = MockProcessor::new();
        processor
            .expect_charge_off_session()
            .times(1)
            .returning(|_| Err(ProcessorError::CardDeclined("Your card has insufficient funds.".to_string())));
        register(cfg, db, processor);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body.contains("declined"), "unexpected body: {body}");
}

#[actix_web::test]
async fn payout_exceeding_the_balance_is_denied() {
    let _ = env_logger::try_init().ok();
    let request = json!({"connected_account_id": "acct_provider", "amount_cents": 1_000});
    let (status, body) = post_request("/release-payout", request, |cfg| {
        let mut processor = MockProcessor::new();
        processor.expect_available_balance().times(1).returning(|_, _| Ok(Cents::from(500)));
        // No create_payout expectation: issuing one must panic the test
        register(cfg, MockOrderStoreDb::new(), processor);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Not enough available balance"), "unexpected body: {body}");
}

#[actix_web::test]
async fn payout_within_the_balance_succeeds() {
    let _ = env_logger::try_init().ok();
    let request = json!({"connected_account_id": "acct_provider", "amount_cents": 1_000});
    let (status, body) = post_request("/release-payout", request, |cfg| {
        let mut processor = MockProcessor::new();
        processor.expect_available_balance().times(1).returning(|_, _| Ok(Cents::from(5_000)));
        processor.expect_create_payout().times(1).returning(|_, _, _| {
            Ok(PayoutReceipt { payout_id: "po_1".to_string(), status: "pending".to_string() })
        });
        register(cfg, MockOrderStoreDb::new(), processor);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""payout_id":"po_1""#), "unexpected body: {body}");
}
