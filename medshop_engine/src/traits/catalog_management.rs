use crate::{
    db_types::{Medicine, MedicineUpdate, NewMedicine},
    traits::{DecrementResult, StoreError},
};

/// Catalog storage, including the inventory ledger.
///
/// Stock only ever changes through [`CatalogManagement::try_decrement`] and [`CatalogManagement::adjust_stock`].
/// Both are single conditional updates, so concurrent callers can never drive stock below zero.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn insert_medicine(&self, medicine: NewMedicine) -> Result<Medicine, StoreError>;

    async fn fetch_medicine(&self, id: i64) -> Result<Option<Medicine>, StoreError>;

    /// Applies a partial update. Any `stock_adjustment` is applied through the ledger in the same transaction.
    /// Returns `None` if the medicine does not exist.
    async fn update_medicine(&self, id: i64, update: MedicineUpdate) -> Result<Option<Medicine>, StoreError>;

    /// Returns true if a medicine was deleted.
    async fn delete_medicine(&self, id: i64) -> Result<bool, StoreError>;

    /// Case-insensitive name search. `page` starts at 1. Returns the page of results and the total match count.
    async fn search_medicines(
        &self,
        search: Option<String>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Medicine>, i64), StoreError>;

    /// Removes `amount` units from stock if, and only if, at least that many are available.
    async fn try_decrement(&self, id: i64, amount: i64) -> Result<DecrementResult, StoreError>;

    /// Adds `delta` (which may be negative) to stock, as long as the result stays non-negative.
    /// Returns the new stock level.
    async fn adjust_stock(&self, id: i64, delta: i64) -> Result<i64, StoreError>;
}
