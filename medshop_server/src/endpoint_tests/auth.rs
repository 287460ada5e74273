use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use medshop_engine::{db_types::Role, CartApi, CatalogApi};

use super::{
    helpers::{api_request, expired_token, issue_token, json},
    mocks::MockShopDb,
};
use crate::routes::{DeleteMedicineRoute, MyCartRoute};

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let (status, body) = api_request(Method::GET, "", "/api/cart", None, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"message":"Authentication Error. No access token was provided.","success":false}"#);
}

#[actix_web::test]
async fn tampered_tokens_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let mut token = issue_token("alice", Role::User);
    let n = token.len();
    // Both replacements keep the base64 canonical, so only the signature check can fail
    let replacement = if token.ends_with("AAAAA") { "AAAAE" } else { "AAAAA" };
    token.replace_range(n - 5..n, replacement);
    let (status, body) = api_request(Method::GET, &token, "/api/cart", None, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "was: {body}");
}

#[actix_web::test]
async fn expired_tokens_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let token = expired_token("alice");
    let (status, body) = api_request(Method::GET, &token, "/api/cart", None, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("expired"), "was: {body}");
}

#[actix_web::test]
async fn users_cannot_reach_admin_routes() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let (status, body) = api_request(Method::DELETE, &token, "/api/admin/medicines/1", None, configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["success"], false);
}

#[actix_web::test]
async fn admins_can_reach_admin_routes() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("root", Role::Admin);
    let (status, body) = api_request(Method::DELETE, &token, "/api/admin/medicines/1", None, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Medicine 1 deleted"}"#);
}

#[actix_web::test]
async fn claims_identify_the_user() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("alice", Role::User);
    let (status, body) = api_request(Method::GET, &token, "/api/cart", None, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"items":[],"total":0}"#);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockShopDb::new();
    db.expect_cart_items().withf(|user_id| user_id == "alice").returning(|_| Ok(vec![]));
    let mut catalog_db = MockShopDb::new();
    catalog_db.expect_delete_medicine().returning(|id| Ok(id == 1));
    cfg.service(MyCartRoute::<MockShopDb>::new())
        .service(DeleteMedicineRoute::<MockShopDb>::new())
        .app_data(web::Data::new(CartApi::new(db)))
        .app_data(web::Data::new(CatalogApi::new(catalog_db)));
}
