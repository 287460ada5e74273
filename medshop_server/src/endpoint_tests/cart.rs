use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use medshop_engine::{db_types::Role, order_objects::CartItem, traits::StoreError, CartApi};
use serde_json::json;

use super::{
    helpers::{api_request, issue_token, json, order},
    mocks::MockShopDb,
};
use crate::routes::{AddToCartRoute, MyCartRoute, RemoveFromCartRoute, UpdateCartItemRoute};

#[actix_web::test]
async fn view_cart() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let (status, body) = api_request(Method::GET, &token, "/api/cart", None, configure).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&body);
    assert_eq!(cart["total"], 2 * 3_500 + 1_200);
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(cart["items"][0]["medicine_name"], "Paracetamol 650mg");
    assert_eq!(cart["items"][0]["order_status"], "Pending");
}

#[actix_web::test]
async fn new_lines_are_created() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let body = json!({ "medicineId": 3, "quantity": 2 });
    let (status, body) = api_request(Method::POST, &token, "/api/cart/add", Some(body), configure).await;
    assert_eq!(status, StatusCode::CREATED);
    let line = json(&body);
    assert_eq!(line["medicine_id"], 3);
    assert_eq!(line["quantity"], 2);
}

#[actix_web::test]
async fn existing_lines_accumulate() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    // Quantity defaults to a single unit
    let body = json!({ "medicineId": 1 });
    let (status, body) = api_request(Method::POST, &token, "/api/cart/add", Some(body), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["quantity"], 3);
}

#[actix_web::test]
async fn cart_quantities_must_be_positive() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let body = json!({ "medicineId": 1, "quantity": 0 });
    let (status, body) = api_request(Method::POST, &token, "/api/cart/add", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Quantity must be a positive whole number, got 0","success":false}"#);

    let body = json!({ "quantity": -2 });
    let (status, _) = api_request(Method::PUT, &token, "/api/cart/items/1", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn update_a_cart_line() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let body = json!({ "quantity": 5 });
    let (status, body) = api_request(Method::PUT, &token, "/api/cart/items/1", Some(body), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["quantity"], 5);

    let body = json!({ "quantity": 50 });
    let (status, body) = api_request(Method::PUT, &token, "/api/cart/items/1", Some(body), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Insufficient stock for Paracetamol 650mg. Only 40 left.","success":false}"#);
}

#[actix_web::test]
async fn remove_cart_lines() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let (status, body) = api_request(Method::DELETE, &token, "/api/cart/remove/1", None, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Item removed from cart"}"#);

    let (status, body) = api_request(Method::DELETE, &token, "/api/cart/remove/8", None, configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"Medicine 8 is not in the cart","success":false}"#);
}

fn cart_item(id: i64, medicine_id: i64, quantity: i64, price: i64, name: &str) -> CartItem {
    CartItem {
        order: order(id, "alice", medicine_id, quantity, price),
        medicine_name: Some(name.to_string()),
        unit_price: Some(price.into()),
        image: None,
        stock: Some(40),
    }
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockShopDb::new();
    db.expect_cart_items().withf(|user| user == "alice").returning(|_| {
        Ok(vec![cart_item(1, 1, 2, 3_500, "Paracetamol 650mg"), cart_item(2, 4, 1, 1_200, "Cetirizine 10mg")])
    });
    db.expect_add_to_cart().returning(|user, medicine_id, quantity| match medicine_id {
        1 => Ok((order(1, user, 1, 2 + quantity, 3_500), false)),
        _ => Ok((order(5, user, medicine_id, quantity, 900), true)),
    });
    db.expect_set_cart_quantity().returning(|user, medicine_id, quantity| {
        if quantity > 40 {
            Err(StoreError::InsufficientStock { medicine_id, name: "Paracetamol 650mg".into(), remaining: 40 })
        } else {
            Ok(order(1, user, medicine_id, quantity, 3_500))
        }
    });
    db.expect_remove_from_cart().returning(|_, medicine_id| Ok(medicine_id == 1));
    cfg.service(MyCartRoute::<MockShopDb>::new())
        .service(AddToCartRoute::<MockShopDb>::new())
        .service(UpdateCartItemRoute::<MockShopDb>::new())
        .service(RemoveFromCartRoute::<MockShopDb>::new())
        .app_data(web::Data::new(CartApi::new(db)));
}
