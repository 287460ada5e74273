//! # Storage backend traits
//!
//! These traits are the contract between the shop APIs and a storage backend.
//!
//! * [`CatalogManagement`] stores the medicine catalog and owns the inventory ledger. It is the only place stock
//!   changes.
//! * [`OrderManagement`] reads order records and applies partial status updates.
//! * [`CartManagement`] manages a user's pending order lines.
//! * [`SettlementDatabase`] groups the multi-record units of work (checkout, online settlement, admin status
//!   changes) that must be atomic.
mod cart_management;
mod catalog_management;
mod order_management;
mod settlement_database;

mod data_objects;
mod store_error;

pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{DecrementResult, LineSettlement};
pub use order_management::OrderManagement;
pub use settlement_database::{SettlementDatabase, ShopDatabase};
pub use store_error::StoreError;
