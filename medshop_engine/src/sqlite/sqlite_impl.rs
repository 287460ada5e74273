//! `SqliteDatabase` is the SQLite storage backend for the medicine shop.
//!
//! It implements all the traits defined in the [`crate::traits`] module. Multi-record units of work run inside a
//! single `sqlx` transaction; dropping the transaction without committing rolls every write back.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, medicines, new_pool, orders};
use crate::{
    db_types::{
        Address,
        Medicine,
        MedicineUpdate,
        NewCartLine,
        NewMedicine,
        Order,
        OrderState,
        OrderStatusType,
        PaymentMethod,
        PaymentStatusType,
    },
    order_objects::{CartItem, OrderQueryFilter, OrderTransition},
    traits::{
        CartManagement,
        CatalogManagement,
        DecrementResult,
        LineSettlement,
        OrderManagement,
        SettlementDatabase,
        StoreError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_medicine(&self, medicine: NewMedicine) -> Result<Medicine, StoreError> {
        let mut tx = self.pool.begin().await?;
        let medicine = medicines::insert_medicine(medicine, &mut tx).await?;
        tx.commit().await?;
        Ok(medicine)
    }

    async fn fetch_medicine(&self, id: i64) -> Result<Option<Medicine>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medicines::fetch_medicine(id, &mut conn).await
    }

    async fn update_medicine(&self, id: i64, update: MedicineUpdate) -> Result<Option<Medicine>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if let Some(delta) = update.stock_adjustment.filter(|d| *d != 0) {
            match medicines::adjust_stock(id, delta, &mut tx).await {
                Ok(_) => {},
                Err(StoreError::MedicineNotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        let medicine = medicines::update_medicine_fields(id, &update, &mut tx).await?;
        tx.commit().await?;
        if let Some(m) = &medicine {
            debug!("🗃️ Medicine #{id} ({}) updated. Stock is {}", m.name, m.stock);
        }
        Ok(medicine)
    }

    async fn delete_medicine(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = medicines::delete_medicine(id, &mut tx).await?;
        tx.commit().await?;
        if deleted {
            info!("🗃️ Medicine #{id} removed from the catalog");
        }
        Ok(deleted)
    }

    async fn search_medicines(
        &self,
        search: Option<String>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Medicine>, i64), StoreError> {
        let mut conn = self.pool.acquire().await?;
        medicines::search_medicines(search.as_deref(), page, page_size, &mut conn).await
    }

    async fn try_decrement(&self, id: i64, amount: i64) -> Result<DecrementResult, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = medicines::try_decrement(id, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn adjust_stock(&self, id: i64, delta: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stock = medicines::adjust_stock(id, delta, &mut tx).await?;
        tx.commit().await?;
        Ok(stock)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }

    async fn find_pending(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::find_pending(user_id, &mut conn).await
    }

    async fn find_by_payment_session(
        &self,
        user_id: &str,
        session_id: &str,
        status: OrderStatusType,
    ) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::find_by_payment_session(user_id, session_id, status, &mut conn).await
    }

    async fn transition(&self, order_id: i64, transition: OrderTransition) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::transition(order_id, transition, &mut tx).await?.ok_or(StoreError::OrderNotFound(order_id))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn stamp_payment_session(&self, user_id: &str, session_id: &str, lines: &[Order]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        for line in lines {
            if !orders::stamp_payment_line(line, session_id, &mut tx).await? {
                debug!("🗃️ Cart line #{} of {user_id} changed before session {session_id} was stamped", line.id);
                return Err(StoreError::CartChanged);
            }
        }
        tx.commit().await?;
        debug!("🗃️ {} cart lines of user {user_id} stamped with payment session {session_id}", lines.len());
        Ok(lines.len() as u64)
    }
}

impl CartManagement for SqliteDatabase {
    async fn cart_items(&self, user_id: &str) -> Result<Vec<CartItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::cart_items(user_id, &mut conn).await
    }

    async fn add_to_cart(&self, user_id: &str, medicine_id: i64, quantity: i64) -> Result<(Order, bool), StoreError> {
        let mut tx = self.pool.begin().await?;
        let medicine =
            medicines::fetch_medicine(medicine_id, &mut tx).await?.ok_or(StoreError::MedicineNotFound(medicine_id))?;
        let existing = orders::find_pending_line(user_id, medicine_id, &mut tx).await?;
        let new_quantity = existing.as_ref().map(|o| o.quantity).unwrap_or(0) + quantity;
        if medicine.stock < new_quantity {
            return Err(StoreError::InsufficientStock {
                medicine_id,
                name: medicine.name,
                remaining: medicine.stock,
            });
        }
        let result = match existing {
            Some(line) => {
                if let Some(session) = &line.payment_session {
                    orders::release_payment_session(user_id, session, &mut tx).await?;
                }
                let order = orders::set_pending_quantity(line.id, new_quantity, &mut tx)
                    .await?
                    .ok_or(StoreError::OrderNotFound(line.id))?;
                (order, false)
            },
            None => {
                let line = NewCartLine::new(user_id, &medicine, quantity);
                let state = OrderState::new(OrderStatusType::Pending, PaymentStatusType::Pending);
                (orders::insert_order(line, state, None, None, &mut tx).await?, true)
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn set_cart_quantity(&self, user_id: &str, medicine_id: i64, quantity: i64) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let line = orders::find_pending_line(user_id, medicine_id, &mut tx)
            .await?
            .ok_or(StoreError::CartItemNotFound(medicine_id))?;
        let medicine =
            medicines::fetch_medicine(medicine_id, &mut tx).await?.ok_or(StoreError::MedicineNotFound(medicine_id))?;
        if medicine.stock < quantity {
            return Err(StoreError::InsufficientStock { medicine_id, name: medicine.name, remaining: medicine.stock });
        }
        if let Some(session) = &line.payment_session {
            orders::release_payment_session(user_id, session, &mut tx).await?;
        }
        let order =
            orders::set_pending_quantity(line.id, quantity, &mut tx).await?.ok_or(StoreError::OrderNotFound(line.id))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn remove_from_cart(&self, user_id: &str, medicine_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(line) = orders::find_pending_line(user_id, medicine_id, &mut tx).await? else {
            return Ok(false);
        };
        if let Some(session) = &line.payment_session {
            orders::release_payment_session(user_id, session, &mut tx).await?;
        }
        let deleted = orders::delete_pending_line(user_id, medicine_id, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

impl SettlementDatabase for SqliteDatabase {
    async fn checkout_cod(
        &self,
        user_id: &str,
        address: &Address,
        prescription: Option<String>,
    ) -> Result<Vec<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let lines = orders::find_pending(user_id, &mut tx).await?;
        if lines.is_empty() {
            return Err(StoreError::EmptyCart);
        }
        let mut confirmed = Vec::with_capacity(lines.len());
        for line in lines {
            match medicines::try_decrement(line.medicine_id, line.quantity, &mut tx).await? {
                DecrementResult::Decremented(remaining) => {
                    trace!("🗃️ COD line #{} took {} units. {remaining} left", line.id, line.quantity);
                },
                DecrementResult::InsufficientStock { name, remaining } => {
                    debug!("🗃️ COD checkout for {user_id} rolled back. Order #{} needs more {name}", line.id);
                    return Err(StoreError::InsufficientStock { medicine_id: line.medicine_id, name, remaining });
                },
                DecrementResult::NotFound => {
                    debug!("🗃️ COD checkout for {user_id} rolled back. Medicine #{} is gone", line.medicine_id);
                    return Err(StoreError::MedicineNotFound(line.medicine_id));
                },
            }
            let update = OrderTransition::cod_confirmed(address, prescription.as_deref());
            let order = orders::transition(line.id, update, &mut tx).await?.ok_or(StoreError::OrderNotFound(line.id))?;
            confirmed.push(order);
        }
        tx.commit().await?;
        info!("🗃️ {} cart lines of user {user_id} confirmed for cash on delivery", confirmed.len());
        Ok(confirmed)
    }

    async fn settle_online_line(
        &self,
        order_id: i64,
        session_id: &str,
        transaction_id: &str,
        address: &Address,
    ) -> Result<LineSettlement, StoreError> {
        let mut tx = self.pool.begin().await?;
        let line = match orders::fetch_order(order_id, &mut tx).await? {
            Some(o) if o.is_pending() && o.payment_session.as_deref() == Some(session_id) => o,
            _ => {
                debug!("🗃️ Order #{order_id} is no longer pending for session {session_id}. Skipping");
                return Ok(LineSettlement::Skipped);
            },
        };
        let result = match medicines::try_decrement(line.medicine_id, line.quantity, &mut tx).await? {
            DecrementResult::Decremented(_) => {
                let update = OrderTransition::online_paid(address, transaction_id);
                let order =
                    orders::transition(order_id, update, &mut tx).await?.ok_or(StoreError::OrderNotFound(order_id))?;
                LineSettlement::Settled(order)
            },
            DecrementResult::InsufficientStock { name, remaining } => {
                let order = orders::transition(order_id, OrderTransition::payment_failed(), &mut tx)
                    .await?
                    .ok_or(StoreError::OrderNotFound(order_id))?;
                LineSettlement::InsufficientStock { order, name, remaining }
            },
            DecrementResult::NotFound => {
                let order = orders::transition(order_id, OrderTransition::payment_failed(), &mut tx)
                    .await?
                    .ok_or(StoreError::OrderNotFound(order_id))?;
                LineSettlement::MedicineNotFound(order)
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fail_payment_session(&self, user_id: &str, session_id: &str) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let failed = orders::fail_payment_session(user_id, session_id, &mut tx).await?;
        tx.commit().await?;
        Ok(failed)
    }

    async fn place_direct_order(
        &self,
        user_id: &str,
        medicine_id: i64,
        quantity: i64,
        address: &Address,
        prescription: Option<String>,
    ) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let medicine =
            medicines::fetch_medicine(medicine_id, &mut tx).await?.ok_or(StoreError::MedicineNotFound(medicine_id))?;
        let line = NewCartLine::new(user_id, &medicine, quantity);
        let state = OrderState::new(OrderStatusType::Processing, PaymentStatusType::Pending);
        let order = orders::insert_order(line, state, Some(address), prescription.as_deref(), &mut tx).await?;
        match medicines::try_decrement(medicine_id, quantity, &mut tx).await? {
            DecrementResult::Decremented(_) => {},
            DecrementResult::InsufficientStock { name, remaining } => {
                return Err(StoreError::InsufficientStock { medicine_id, name, remaining });
            },
            DecrementResult::NotFound => return Err(StoreError::MedicineNotFound(medicine_id)),
        }
        tx.commit().await?;
        info!("🗃️ Direct order #{} placed by {user_id}: {quantity} x {}", order.id, medicine.name);
        Ok(order)
    }

    async fn update_order_status(&self, order_id: i64, new_status: OrderStatusType) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(StoreError::OrderNotFound(order_id))?;
        if !order.order_status.can_transition_to(new_status) {
            return Err(StoreError::InvalidStatusTransition { from: order.order_status, to: new_status });
        }
        let mut update = OrderTransition::default().with_order_status(new_status);
        match new_status {
            OrderStatusType::Delivered if order.payment_method == PaymentMethod::Cod => {
                update = update.with_payment_status(PaymentStatusType::Paid);
            },
            OrderStatusType::Cancelled => {
                match medicines::adjust_stock(order.medicine_id, order.quantity, &mut tx).await {
                    Ok(stock) => {
                        debug!("🗃️ {} units returned to medicine #{}. Stock: {stock}", order.quantity, order.medicine_id)
                    },
                    Err(StoreError::MedicineNotFound(id)) => {
                        warn!("🗃️ Order #{order_id} cancelled, but medicine #{id} no longer exists. Stock not restored");
                    },
                    Err(e) => return Err(e),
                }
            },
            _ => {},
        }
        let updated = orders::transition(order_id, update, &mut tx).await?.ok_or(StoreError::OrderNotFound(order_id))?;
        tx.commit().await?;
        info!("🗃️ Order #{order_id} moved from {} to {}", order.state(), updated.state());
        Ok(updated)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date using the embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}
