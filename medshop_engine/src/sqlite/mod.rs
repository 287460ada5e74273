//! SQLite storage backend for the medicine shop.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
