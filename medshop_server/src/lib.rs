//! # Medicine shop server
//! This crate hosts the HTTP server of the medicine shop. It is responsible for:
//! * Authenticating callers with the bearer JWT issued by the user service, and enforcing admin-only routes.
//! * Parsing requests, handing them to the engine APIs and mapping engine errors to HTTP status codes.
//! * Wiring the online payment gateway into the engine, or running without it when no credentials are configured.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/medicines`: The public catalog.
//! * `/api/cart/...`, `/api/orders/...`, `/api/payment/...`: Cart, checkout and payment routes for signed-in users.
//! * `/api/admin/...`: Catalog and order management for admins.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
