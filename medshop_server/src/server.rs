use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use medshop_engine::{CartApi, CatalogApi, OrderApi, PaymentVerifier, SettlementApi, SqliteDatabase};

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    integrations::gateway::{payment_verifier, GatewaySessions},
    middleware::JwtAuthMiddlewareFactory,
    routes::{
        health,
        AddMedicineRoute,
        AddToCartRoute,
        AllOrdersRoute,
        CheckoutRoute,
        ConfirmPaymentRoute,
        DeleteMedicineRoute,
        DirectOrderRoute,
        MedicineByIdRoute,
        MyCartRoute,
        MyOrdersRoute,
        RemoveFromCartRoute,
        ReservePaymentRoute,
        SearchMedicinesRoute,
        UpdateCartItemRoute,
        UpdateMedicineRoute,
        UpdateOrderStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    } else {
        info!("🚀️ Skipping database migrations");
    }
    let verifier = payment_verifier(config.gateway.clone())?;
    let srv = create_server_instance(config, db, verifier)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    verifier: PaymentVerifier<GatewaySessions>,
) -> Result<Server, ServerError> {
    let token_verifier = Arc::new(TokenVerifier::new(&config.auth));
    let retries = config.settlement_retries;
    let srv = HttpServer::new(move || {
        let catalog_api = CatalogApi::new(db.clone());
        let cart_api = CartApi::new(db.clone());
        let orders_api = OrderApi::new(db.clone());
        let settlement_api = SettlementApi::new(db.clone(), verifier.clone()).with_retries(retries);
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtAuthMiddlewareFactory::new(Arc::clone(&token_verifier)))
            .service(MyCartRoute::<SqliteDatabase>::new())
            .service(AddToCartRoute::<SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<SqliteDatabase>::new())
            .service(RemoveFromCartRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase, GatewaySessions>::new())
            .service(DirectOrderRoute::<SqliteDatabase, GatewaySessions>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(ReservePaymentRoute::<SqliteDatabase, GatewaySessions>::new())
            .service(ConfirmPaymentRoute::<SqliteDatabase, GatewaySessions>::new())
            .service(AddMedicineRoute::<SqliteDatabase>::new())
            .service(UpdateMedicineRoute::<SqliteDatabase>::new())
            .service(DeleteMedicineRoute::<SqliteDatabase>::new())
            .service(AllOrdersRoute::<SqliteDatabase, GatewaySessions>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase, GatewaySessions>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("msp::access_log"))
            .app_data(json_config())
            .app_data(path_config())
            .app_data(query_config())
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(settlement_api))
            .service(health)
            .service(SearchMedicinesRoute::<SqliteDatabase>::new())
            .service(MedicineByIdRoute::<SqliteDatabase>::new())
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Server listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Malformed JSON bodies are reported with the standard error body and a 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}
