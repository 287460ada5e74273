use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use medshop_engine::{
    db_types::{OrderStatusType, PaymentMethod, PaymentStatusType, Role},
    traits::StoreError,
    OrderApi,
    PaymentVerifier,
    SettlementApi,
};
use serde_json::json;

use super::{
    helpers::{api_request, issue_token, json, order, settled},
    mocks::{MockGateway, MockShopDb},
};
use crate::routes::{AllOrdersRoute, DirectOrderRoute, MyOrdersRoute, UpdateOrderStatusRoute};

#[actix_web::test]
async fn order_history() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let (status, body) = api_request(Method::GET, &token, "/api/orders/my", None, configure_history).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body);
    assert_eq!(orders.as_array().map(Vec::len), Some(2));
    assert_eq!(orders[0]["order_status"], "Shipped");
    assert_eq!(orders[0]["payment_method"], "COD");
    assert_eq!(orders[0]["city"], "Mumbai");
    assert_eq!(orders[1]["order_status"], "Pending");
}

#[actix_web::test]
async fn direct_cash_on_delivery_order() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let body = json!({
        "medicineId": 1,
        "quantity": 2,
        "paymentMethod": "COD",
        "address": { "street": "221B Baker Street", "city": "Mumbai", "postalCode": "400001", "phone": "+91 22 5555 0101" },
        "prescription": "rx-2291"
    });
    let (status, body) = api_request(Method::POST, &token, "/api/orders", Some(body), configure_direct).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = json(&body);
    assert_eq!(order["order_status"], "Processing");
    assert_eq!(order["payment_status"], "Pending");
    assert_eq!(order["prescription"], "rx-2291");
}

#[actix_web::test]
async fn direct_online_orders_go_to_the_cart() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let body = json!({ "medicineId": 4, "quantity": 1, "paymentMethod": "ONLINE" });
    let (status, body) = api_request(Method::POST, &token, "/api/orders", Some(body), configure_direct).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = json(&body);
    assert_eq!(order["order_status"], "Pending");
    assert_eq!(order["payment_method"], "ONLINE");
}

#[actix_web::test]
async fn direct_orders_need_an_address() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let body = json!({ "medicineId": 1, "quantity": 2, "address": { "street": "221B Baker Street" } });
    let (status, body) = api_request(Method::POST, &token, "/api/orders", Some(body), configure_direct).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("A complete delivery address"), "was: {body}");
}

#[actix_web::test]
async fn admins_list_orders_by_status() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("root", Role::Admin);
    let path = "/api/admin/orders?status=Processing&paymentStatus=Paid";
    let (status, body) = api_request(Method::GET, &token, path, None, configure_admin).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body);
    assert_eq!(orders.as_array().map(Vec::len), Some(1));
    assert_eq!(orders[0]["id"], 12);

    let (status, _) = api_request(Method::GET, &token, "/api/admin/orders?status=Lost", None, configure_admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn users_cannot_list_all_orders() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let (status, body) = api_request(Method::GET, &token, "/api/admin/orders", None, configure_admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.starts_with(r#"{"message":"Authentication Error. Insufficient Permissions."#), "was: {body}");
}

#[actix_web::test]
async fn admins_ship_orders() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("root", Role::Admin);
    let body = json!({ "status": "Shipped" });
    let (status, body) = api_request(Method::PUT, &token, "/api/admin/orders/12", Some(body), configure_admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["order_status"], "Shipped");
}

#[actix_web::test]
async fn invalid_status_changes_are_rejected() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("root", Role::Admin);
    let body = json!({ "status": "Pending" });
    let (status, body) = api_request(Method::PUT, &token, "/api/admin/orders/12", Some(body), configure_admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Cannot move an order from Processing to Pending","success":false}"#);

    let body = json!({ "status": "Delivered" });
    let (status, body) = api_request(Method::PUT, &token, "/api/admin/orders/99", Some(body), configure_admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"Order 99 does not exist","success":false}"#);
}

fn configure_history(cfg: &mut ServiceConfig) {
    let mut db = MockShopDb::new();
    db.expect_fetch_orders_for_user().withf(|user| user == "alice").returning(|user| {
        let shipped = settled(order(3, user, 1, 2, 3_500), OrderStatusType::Shipped, PaymentStatusType::Pending);
        Ok(vec![shipped, order(7, user, 4, 1, 1_200)])
    });
    cfg.service(MyOrdersRoute::<MockShopDb>::new()).app_data(web::Data::new(OrderApi::new(db)));
}

fn configure_direct(cfg: &mut ServiceConfig) {
    let mut db = MockShopDb::new();
    db.expect_place_direct_order().times(0..=1).returning(|user, medicine_id, quantity, _, prescription| {
        let mut placed = settled(
            order(20, user, medicine_id, quantity, 3_500),
            OrderStatusType::Processing,
            PaymentStatusType::Pending,
        );
        placed.prescription = prescription;
        Ok(placed)
    });
    db.expect_add_to_cart().times(0..=1).returning(|user, medicine_id, quantity| {
        let mut line = order(21, user, medicine_id, quantity, 1_200);
        line.payment_method = PaymentMethod::Online;
        Ok((line, true))
    });
    let api = SettlementApi::new(db, PaymentVerifier::<MockGateway>::unavailable());
    cfg.service(DirectOrderRoute::<MockShopDb, MockGateway>::new()).app_data(web::Data::new(api));
}

fn configure_admin(cfg: &mut ServiceConfig) {
    let mut db = MockShopDb::new();
    db.expect_search_orders()
        .withf(|q| {
            q.status.as_deref() == Some(&[OrderStatusType::Processing][..]) &&
                q.payment_status == Some(PaymentStatusType::Paid) &&
                q.user_id.is_none()
        })
        .returning(|_| {
            Ok(vec![settled(order(12, "bob", 2, 1, 8_000), OrderStatusType::Processing, PaymentStatusType::Paid)])
        });
    db.expect_update_order_status().returning(|id, status| {
        if id != 12 {
            return Err(StoreError::OrderNotFound(id));
        }
        if !OrderStatusType::Processing.can_transition_to(status) {
            return Err(StoreError::InvalidStatusTransition { from: OrderStatusType::Processing, to: status });
        }
        Ok(settled(order(12, "bob", 2, 1, 8_000), status, PaymentStatusType::Paid))
    });
    let api = SettlementApi::new(db, PaymentVerifier::<MockGateway>::unavailable());
    cfg.service(AllOrdersRoute::<MockShopDb, MockGateway>::new())
        .service(UpdateOrderStatusRoute::<MockShopDb, MockGateway>::new())
        .app_data(web::Data::new(api));
}
