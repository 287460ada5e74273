//! # Medicine shop public API
//!
//! The `shop_api` module exposes the programmatic API of the shop engine. Each API wraps a storage backend that
//! implements the backend traits it needs, so that callers never talk to the database directly.
//!
//! * [`catalog_api`] manages the medicine catalog.
//! * [`cart_api`] manages a user's cart, i.e. their pending order lines.
//! * [`order_api`] provides order history queries.
//! * [`settlement_api`] turns cart lines into confirmed orders, for cash-on-delivery and online payments, and
//!   handles admin status changes.
//! * [`payment_verifier`] wraps the payment gateway capability and checks payment signatures.
//!
//! # API usage
//!
//! ```rust,ignore
//! use medshop_engine::{CartApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements CartManagement
//! let api = CartApi::new(db);
//! let cart = api.cart("user-1").await?;
//! ```
pub mod cart_api;
pub mod catalog_api;
pub mod errors;
pub mod order_api;
pub mod order_objects;
pub mod payment_verifier;
pub mod settlement_api;
