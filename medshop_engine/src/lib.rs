//! Medicine Shop Engine
//!
//! This library contains the storage backends and the business logic of the medicine shop: the catalog, carts,
//! order settlement and payment verification. It knows nothing about HTTP.
//!
//! The library is divided into three main sections:
//! 1. The storage backend contracts ([`mod@traits`]). A backend implements these traits to be usable by the shop APIs.
//!    SQLite ([`SqliteDatabase`]) is the supported backend. The data types stored in the database are defined in
//!    [`mod@db_types`] and are public.
//! 2. The SQLite backend itself. You should never need to access the database directly; use the public APIs instead.
//! 3. The shop public API ([`CatalogApi`], [`CartApi`], [`OrderApi`], [`SettlementApi`]). These wrap a backend and
//!    enforce the shop's rules: validation, stock checks, status transitions and the settlement units of work.
//!
//! ## Orders and cart lines
//! There is no separate cart table. A cart line is an order record whose `order_status` is `Pending`. Settlement
//! moves it to `Processing` in the same transaction that takes its units out of stock.
pub mod db_types;
mod shop_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub mod traits;

pub use shop_api::{
    cart_api::CartApi,
    catalog_api::CatalogApi,
    errors::SettlementError,
    order_api::OrderApi,
    order_objects,
    payment_verifier::{GatewayCapability, PaymentSessionInfo, PaymentSessionProvider, PaymentVerifier, ProviderError},
    settlement_api::{SettlementApi, DEFAULT_SETTLEMENT_RETRIES},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
