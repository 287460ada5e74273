use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Medicine, MedicineUpdate, NewMedicine},
    order_objects::{MedicinePage, MedicineQuery, MEDICINES_PER_PAGE},
    traits::{CatalogManagement, StoreError},
};

/// `CatalogApi` manages the medicine catalog: browsing for everyone, and create / edit / delete for admins.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn add_medicine(&self, medicine: NewMedicine) -> Result<Medicine, StoreError> {
        medicine.validate().map_err(StoreError::ValidationError)?;
        let medicine = self.db.insert_medicine(medicine).await?;
        info!("💊️ {} (#{}) added at {} with {} in stock", medicine.name, medicine.id, medicine.price, medicine.stock);
        Ok(medicine)
    }

    pub async fn medicine(&self, id: i64) -> Result<Medicine, StoreError> {
        self.db.fetch_medicine(id).await?.ok_or(StoreError::MedicineNotFound(id))
    }

    /// Applies a partial update. A price change only affects cart lines created afterwards, since every line keeps its
    /// own price snapshot.
    pub async fn update_medicine(&self, id: i64, update: MedicineUpdate) -> Result<Medicine, StoreError> {
        update.validate().map_err(StoreError::ValidationError)?;
        if update.is_empty() {
            return self.medicine(id).await;
        }
        self.db.update_medicine(id, update).await?.ok_or(StoreError::MedicineNotFound(id))
    }

    pub async fn delete_medicine(&self, id: i64) -> Result<(), StoreError> {
        if self.db.delete_medicine(id).await? {
            Ok(())
        } else {
            Err(StoreError::MedicineNotFound(id))
        }
    }

    pub async fn search(&self, query: MedicineQuery) -> Result<MedicinePage, StoreError> {
        let page = query.page();
        let search = query.search_term().map(String::from);
        let (medicines, total) = self.db.search_medicines(search, page, MEDICINES_PER_PAGE).await?;
        trace!("💊️ Catalog search {:?} page {page}: {} of {total}", query.search_term(), medicines.len());
        Ok(MedicinePage::new(medicines, total, page))
    }
}
