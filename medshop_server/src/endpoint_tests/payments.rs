use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use gateway_tools::calculate_signature;
use medshop_engine::{
    db_types::{Money, Order, OrderStatusType, PaymentMethod, PaymentStatusType, Role},
    traits::{LineSettlement, StoreError},
    PaymentSessionInfo,
    PaymentVerifier,
    ProviderError,
    SettlementApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{address, api_request, gateway_verifier, issue_token, json, medicine, order, settled, GATEWAY_SECRET},
    mocks::{MockGateway, MockShopDb},
};
use crate::routes::{CheckoutRoute, ConfirmPaymentRoute, ReservePaymentRoute};

fn address_json() -> Value {
    serde_json::to_value(address()).expect("Address is serializable")
}

fn mount(db: MockShopDb, verifier: PaymentVerifier<MockGateway>, retries: u32) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = SettlementApi::new(db, verifier).with_retries(retries);
        cfg.service(CheckoutRoute::<MockShopDb, MockGateway>::new())
            .service(ReservePaymentRoute::<MockShopDb, MockGateway>::new())
            .service(ConfirmPaymentRoute::<MockShopDb, MockGateway>::new())
            .app_data(web::Data::new(api));
    }
}

fn online_line(id: i64, medicine_id: i64, quantity: i64, price: i64) -> Order {
    let mut line = order(id, "alice", medicine_id, quantity, price);
    line.payment_method = PaymentMethod::Online;
    line.payment_session = Some("sess_001".to_string());
    line
}

//----------------------------------------------   Cash on delivery  ----------------------------------------------
#[actix_web::test]
async fn checkout_needs_a_complete_address() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_checkout_cod().never();
    let body = json!({ "address": { "street": "221B Baker Street", "city": "Mumbai", "postalCode": "400001" } });
    let configure = mount(db, PaymentVerifier::unavailable(), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/cart/checkout", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"message":"A complete delivery address (street, city, postal code and phone) is required","success":false}"#
    );
}

#[actix_web::test]
async fn cash_on_delivery_checkout() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_checkout_cod()
        .withf(|user, address, prescription| {
            user == "alice" && address.city == "Mumbai" && prescription.as_deref() == Some("rx-77")
        })
        .times(1)
        .returning(|user, _, prescription| {
            let orders = [order(1, user, 1, 2, 3_500), order(2, user, 4, 1, 1_200)]
                .into_iter()
                .map(|o| settled(o, OrderStatusType::Processing, PaymentStatusType::Pending))
                .map(|mut o| {
                    o.prescription = prescription.clone();
                    o
                })
                .collect();
            Ok(orders)
        });
    let body = json!({ "address": address_json(), "prescription": "rx-77" });
    let configure = mount(db, PaymentVerifier::unavailable(), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/cart/checkout", Some(body), configure).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["success"], true);
    assert_eq!(result["message"], "Order placed successfully. 2 items will be paid for on delivery");
    assert_eq!(result["orders"][1]["order_status"], "Processing");
    assert_eq!(result["orders"][1]["prescription"], "rx-77");
}

#[actix_web::test]
async fn checkout_with_short_stock() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_checkout_cod().times(1).returning(|_, _, _| {
        Err(StoreError::InsufficientStock { medicine_id: 9, name: "Insulin".into(), remaining: 1 })
    });
    let body = json!({ "address": address_json() });
    let configure = mount(db, PaymentVerifier::unavailable(), 3);
    let (status, body) = api_request(Method::POST, &token, "/api/cart/checkout", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Insufficient stock for Insulin. Only 1 left.","success":false}"#);
}

#[actix_web::test]
async fn checkout_of_an_empty_cart() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_checkout_cod().returning(|_, _, _| Err(StoreError::EmptyCart));
    let body = json!({ "address": address_json() });
    let configure = mount(db, PaymentVerifier::unavailable(), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/cart/checkout", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"The cart is empty","success":false}"#);
}

#[actix_web::test]
async fn storage_conflicts_are_retried_then_reported() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    // One attempt plus one retry
    db.expect_checkout_cod()
        .times(2)
        .returning(|_, _, _| Err(StoreError::StorageConflict("database is locked".into())));
    let body = json!({ "address": address_json() });
    let configure = mount(db, PaymentVerifier::unavailable(), 1);
    let (status, body) = api_request(Method::POST, &token, "/api/cart/checkout", Some(body), configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("concurrent update"), "was: {body}");
}

//----------------------------------------------   Reservations  ----------------------------------------------
#[actix_web::test]
async fn reservations_need_a_gateway() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_pending().never();
    let configure = mount(db, PaymentVerifier::unavailable(), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/reserve", None, configure).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, r#"{"message":"Online payments are not available","success":false}"#);
}

#[actix_web::test]
async fn reserve_a_payment_session() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_pending()
        .withf(|user| user == "alice")
        .returning(|user| Ok(vec![order(1, user, 1, 2, 3_500), order(2, user, 4, 1, 1_200)]));
    db.expect_fetch_medicine().returning(|id| Ok(Some(medicine(id, "Any", 100, 10))));
    db.expect_stamp_payment_session()
        .withf(|user, session, lines| {
            user == "alice" && session == "sess_001" && lines.iter().map(|o| o.id).eq([1, 2])
        })
        .times(1)
        .returning(|_, _, lines| Ok(lines.len() as u64));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_payment_session()
        .withf(|amount, currency, receipt| {
            *amount == Money::from(8_200) && currency == "INR" && receipt.starts_with("receipt_alice_")
        })
        .times(1)
        .returning(|amount, currency, _| {
            Ok(PaymentSessionInfo { session_id: "sess_001".into(), amount, currency: currency.to_string() })
        });
    let configure = mount(db, gateway_verifier(gateway), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/reserve", None, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"sessionId":"sess_001","amount":8200,"currency":"INR"}"#);
}

#[actix_web::test]
async fn reserving_an_empty_cart() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_pending().returning(|_| Ok(vec![]));
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_session().never();
    let configure = mount(db, gateway_verifier(gateway), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/reserve", None, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"The cart is empty","success":false}"#);
}

#[actix_web::test]
async fn cart_edits_during_a_reservation_are_a_conflict() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_pending().returning(|user| Ok(vec![order(1, user, 1, 1, 3_500)]));
    db.expect_fetch_medicine().returning(|id| Ok(Some(medicine(id, "Any", 100, 10))));
    db.expect_stamp_payment_session().times(1).returning(|_, _, _| Err(StoreError::CartChanged));
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_session().returning(|amount, currency, _| {
        Ok(PaymentSessionInfo { session_id: "sess_002".into(), amount, currency: currency.to_string() })
    });
    let configure = mount(db, gateway_verifier(gateway), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/reserve", None, configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        r#"{"message":"The cart changed while the payment was being prepared. Please try again.","success":false}"#
    );
}

#[actix_web::test]
async fn gateway_failures_are_bad_gateway() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_pending().returning(|user| Ok(vec![order(1, user, 1, 1, 3_500)]));
    db.expect_fetch_medicine().returning(|id| Ok(Some(medicine(id, "Any", 100, 10))));
    db.expect_stamp_payment_session().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_session().returning(|_, _, _| Err(ProviderError("HTTP 401".into())));
    let configure = mount(db, gateway_verifier(gateway), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/reserve", None, configure).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("HTTP 401"), "was: {body}");
}

//----------------------------------------------   Confirmation  ----------------------------------------------
#[actix_web::test]
async fn forged_signatures_fail_the_session() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_fail_payment_session()
        .withf(|user, session| user == "alice" && session == "sess_001")
        .times(1)
        .returning(|_, _| Ok(2));
    db.expect_find_by_payment_session().never();
    let body = json!({
        "sessionId": "sess_001",
        "transactionId": "pay_001",
        "signature": calculate_signature("not the gateway secret", "sess_001", "pay_001"),
        "address": address_json()
    });
    let configure = mount(db, gateway_verifier(MockGateway::new()), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/confirm", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Payment verification failed. The signature does not match.","success":false}"#);
}

#[actix_web::test]
async fn confirm_a_payment() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_by_payment_session()
        .withf(|user, session, status| user == "alice" && session == "sess_001" && *status == OrderStatusType::Pending)
        .returning(|_, _, _| Ok(vec![online_line(1, 1, 2, 3_500), online_line(2, 4, 1, 1_200)]));
    db.expect_settle_online_line()
        .withf(|_, session, transaction, address| {
            session == "sess_001" && transaction == "pay_001" && address.is_complete()
        })
        .times(2)
        .returning(|id, _, transaction, _| {
            let price = if id == 1 { 3_500 } else { 1_200 };
            let mut paid = settled(online_line(id, id, 1, price), OrderStatusType::Processing, PaymentStatusType::Paid);
            paid.transaction_id = Some(transaction.to_string());
            Ok(LineSettlement::Settled(paid))
        });
    let body = json!({
        "sessionId": "sess_001",
        "transactionId": "pay_001",
        "signature": calculate_signature(GATEWAY_SECRET, "sess_001", "pay_001"),
        "address": address_json()
    });
    let configure = mount(db, gateway_verifier(MockGateway::new()), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/confirm", Some(body), configure).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["message"], "Payment verified. 2 orders paid");
    assert_eq!(result["orders"][0]["payment_status"], "Paid");
    assert_eq!(result["orders"][0]["transaction_id"], "pay_001");
    assert_eq!(result["orders"][1]["payment_method"], "ONLINE");
}

#[actix_web::test]
async fn confirming_twice_settles_nothing() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_by_payment_session().returning(|_, _, _| Ok(vec![]));
    db.expect_search_orders()
        .withf(|query| query.user_id.as_deref() == Some("alice") && query.payment_session.as_deref() == Some("sess_001"))
        .returning(|_| {
            Ok(vec![settled(online_line(1, 1, 2, 3_500), OrderStatusType::Processing, PaymentStatusType::Paid)])
        });
    db.expect_settle_online_line().never();
    let body = json!({
        "sessionId": "sess_001",
        "transactionId": "pay_001",
        "signature": calculate_signature(GATEWAY_SECRET, "sess_001", "pay_001"),
        "address": address_json()
    });
    let configure = mount(db, gateway_verifier(MockGateway::new()), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/confirm", Some(body), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "Payment verified. 0 orders paid");
}

#[actix_web::test]
async fn paid_lines_that_run_out_of_stock_are_cancelled() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_by_payment_session()
        .returning(|_, _, _| Ok(vec![online_line(1, 1, 2, 3_500), online_line(2, 9, 3, 45_000)]));
    db.expect_settle_online_line().times(2).returning(|id, _, _, _| {
        if id == 1 {
            let paid = settled(online_line(1, 1, 2, 3_500), OrderStatusType::Processing, PaymentStatusType::Paid);
            Ok(LineSettlement::Settled(paid))
        } else {
            let failed = settled(online_line(2, 9, 3, 45_000), OrderStatusType::Cancelled, PaymentStatusType::Failed);
            Ok(LineSettlement::InsufficientStock { order: failed, name: "Insulin".into(), remaining: 1 })
        }
    });
    let body = json!({
        "sessionId": "sess_001",
        "transactionId": "pay_001",
        "signature": calculate_signature(GATEWAY_SECRET, "sess_001", "pay_001"),
        "address": address_json()
    });
    let configure = mount(db, gateway_verifier(MockGateway::new()), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/confirm", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"message":"Order 2 was cancelled. Orders already paid: 1. Insufficient stock for Insulin. Only 1 left.","success":false}"#
    );
}

#[actix_web::test]
async fn paid_lines_for_deleted_medicines_are_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_by_payment_session().returning(|_, _, _| Ok(vec![online_line(5, 3, 1, 800)]));
    db.expect_settle_online_line().times(1).returning(|_, _, _, _| {
        let failed = settled(online_line(5, 3, 1, 800), OrderStatusType::Cancelled, PaymentStatusType::Failed);
        Ok(LineSettlement::MedicineNotFound(failed))
    });
    let body = json!({
        "sessionId": "sess_001",
        "transactionId": "pay_001",
        "signature": calculate_signature(GATEWAY_SECRET, "sess_001", "pay_001"),
        "address": address_json()
    });
    let configure = mount(db, gateway_verifier(MockGateway::new()), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/confirm", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"message":"Order 5 was cancelled. Orders already paid: none. Medicine 3 does not exist","success":false}"#
    );
}

#[actix_web::test]
async fn released_sessions_settle_nothing() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let mut db = MockShopDb::new();
    db.expect_find_by_payment_session().returning(|_, _, _| Ok(vec![]));
    db.expect_search_orders().returning(|_| Ok(vec![]));
    db.expect_settle_online_line().never();
    let body = json!({
        "sessionId": "sess_001",
        "transactionId": "pay_001",
        "signature": calculate_signature(GATEWAY_SECRET, "sess_001", "pay_001"),
        "address": address_json()
    });
    let configure = mount(db, gateway_verifier(MockGateway::new()), 0);
    let (status, body) = api_request(Method::POST, &token, "/api/payment/confirm", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Payment session sess_001 has nothing to settle"), "was: {body}");
}

#[actix_web::test]
async fn confirmations_without_a_gateway() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let body = json!({
        "sessionId": "sess_001",
        "transactionId": "pay_001",
        "signature": "00",
        "address": address_json()
    });
    let configure = mount(MockShopDb::new(), PaymentVerifier::unavailable(), 0);
    let (status, _) = api_request(Method::POST, &token, "/api/payment/confirm", Some(body), configure).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
