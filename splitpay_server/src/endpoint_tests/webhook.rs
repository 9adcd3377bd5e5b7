use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use splitpay_engine::{db_types::OrderStatusType, helpers::SplitConfig, traits::SetupConfirmation, ReconcilerApi};
use spg_common::Secret;
use stripe_tools::webhook::{build_signature_header, SIGNATURE_HEADER};

use super::{
    helpers::post_raw_request,
    mocks::{order_fixture, MockOrderStoreDb, MockProcessor},
};
use crate::{config::ServerConfig, middleware::SignatureMiddlewareFactory, routes::WebhookRoute};

const WEBHOOK_SECRET: &str = "whsec_endpoint_test";

const SETUP_COMPLETED: &str = r#"{
  "id": "evt_1",
  "type": "checkout.session.completed",
  "data": { "object": {
    "id": "cs_1",
    "mode": "setup",
    "setup_intent": "seti_1",
    "metadata": { "order_id": "ord_1" }
  }}
}"#;

fn register(cfg: &mut ServiceConfig, db: MockOrderStoreDb, processor: MockProcessor) {
    let api = ReconcilerApi::new(db, processor, SplitConfig::default(), "usd".to_string());
    let scope = web::scope("/webhook")
        .wrap(SignatureMiddlewareFactory::new(Secret::new(WEBHOOK_SECRET.to_string()), true))
        .service(WebhookRoute::<MockOrderStoreDb, MockProcessor>::new());
    cfg.service(scope).app_data(web::Data::new(api)).app_data(web::Data::new(ServerConfig::default()));
}

fn signed_header(secret: &str, body: &str) -> (&'static str, String) {
    (SIGNATURE_HEADER, build_signature_header(secret, Utc::now().timestamp(), body.as_bytes()))
}

#[actix_web::test]
async fn deliveries_without_a_signature_are_rejected() {
    let _ = env_logger::try_init().ok();
    let err = post_raw_request("/webhook", SETUP_COMPLETED, vec![], |cfg| {
        // Nothing may be touched when the signature check fails
        register(cfg, MockOrderStoreDb::new(), MockProcessor::new());
    })
    .await
    .expect_err("Expected error");
    assert_eq!(err, "No signature found.");
}

#[actix_web::test]
async fn deliveries_signed_with_the_wrong_secret_are_rejected() {
    let _ = env_logger::try_init().ok();
    let headers = vec![signed_header("whsec_someone_else", SETUP_COMPLETED)];
    let err = post_raw_request("/webhook", SETUP_COMPLETED, headers, |cfg| {
        register(cfg, MockOrderStoreDb::new(), MockProcessor::new());
    })
    .await
    .expect_err("Expected error");
    assert_eq!(err, "Invalid signature.");
}

#[actix_web::test]
async fn a_valid_card_setup_event_saves_the_card() {
    let _ = env_logger::try_init().ok();
    let headers = vec![signed_header(WEBHOOK_SECRET, SETUP_COMPLETED)];
    let (status, body) = post_raw_request("/webhook", SETUP_COMPLETED, headers, |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_claim_event().times(1).returning(|_| Ok(true));
        db.expect_fetch_order()
            .times(1)
            .returning(|_| Ok(Some(order_fixture("ord_1", OrderStatusType::Created))));
        db.expect_record_card_saved()
            .times(1)
            .returning(|_, _, _| Ok(order_fixture("ord_1", OrderStatusType::CardSaved)));
        let mut processor = MockProcessor::new();
        processor.expect_retrieve_setup_confirmation().times(1).returning(|_| {
            Ok(SetupConfirmation { customer_id: "cus_1".to_string(), payment_method_id: "pm_1".to_string() })
        });
        register(cfg, db, processor);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Card saved for order #ord_1"), "unexpected body: {body}");
}

#[actix_web::test]
async fn duplicate_deliveries_are_acknowledged_without_effect() {
    let _ = env_logger::try_init().ok();
    let headers = vec![signed_header(WEBHOOK_SECRET, SETUP_COMPLETED)];
    let (status, body) = post_raw_request("/webhook", SETUP_COMPLETED, headers, |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_claim_event().times(1).returning(|_| Ok(false));
        // Neither the store nor the processor may be touched for a duplicate
        register(cfg, db, MockProcessor::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("already processed"), "unexpected body: {body}");
}

#[actix_web::test]
async fn unhandled_event_types_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body_json = r#"{"id":"evt_2","type":"invoice.created","data":{"object":{}}}"#;
    let headers = vec![signed_header(WEBHOOK_SECRET, body_json)];
    let (status, body) = post_raw_request("/webhook", body_json, headers, |cfg| {
        let mut db = MockOrderStoreDb::new();
        db.expect_claim_event().times(1).returning(|_| Ok(true));
        register(cfg, db, MockProcessor::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("unhandled event type"), "unexpected body: {body}");
}

#[actix_web::test]
async fn garbage_payloads_with_a_valid_signature_are_bad_requests() {
    let _ = env_logger::try_init().ok();
    let body_json = "not json at all";
    let headers = vec![signed_header(WEBHOOK_SECRET, body_json)];
    let (status, _) = post_raw_request("/webhook", body_json, headers, |cfg| {
        register(cfg, MockOrderStoreDb::new(), MockProcessor::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
