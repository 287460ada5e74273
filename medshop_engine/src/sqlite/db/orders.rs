use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Address, NewCartLine, Order, OrderState, OrderStatusType, PaymentStatusType},
    order_objects::{CartItem, OrderQueryFilter, OrderTransition},
    traits::StoreError,
};

/// Inserts a new order record with the given initial state. A `Pending` state makes it a cart line.
///
/// This is not atomic on its own. Embed the call in a transaction and pass `&mut *tx` if it is part of a larger unit
/// of work.
pub async fn insert_order(
    line: NewCartLine,
    state: OrderState,
    address: Option<&Address>,
    prescription: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                user_id,
                medicine_id,
                quantity,
                price_at_order,
                payment_method,
                order_status,
                payment_status,
                street,
                city,
                postal_code,
                phone,
                prescription
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(line.user_id)
    .bind(line.medicine_id)
    .bind(line.quantity)
    .bind(line.price_at_order)
    .bind(line.payment_method)
    .bind(state.order_status)
    .bind(state.payment_status)
    .bind(address.map(|a| a.street.clone()))
    .bind(address.map(|a| a.city.clone()))
    .bind(address.map(|a| a.postal_code.clone()))
    .bind(address.map(|a| a.phone.clone()))
    .bind(prescription)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} created for user {} ({})", order.id, order.user_id, order.state());
    Ok(order)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn find_pending(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 AND order_status = 'Pending' ORDER BY id ASC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn find_pending_line(
    user_id: &str,
    medicine_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 AND medicine_id = $2 AND order_status = 'Pending'",
    )
    .bind(user_id)
    .bind(medicine_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn find_by_payment_session(
    user_id: &str,
    session_id: &str,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StoreError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 AND payment_session = $2 AND order_status = $3 ORDER BY id ASC",
    )
    .bind(user_id)
    .bind(session_id)
    .bind(status)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE 1 = 1");
    if let Some(user_id) = query.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(medicine_id) = query.medicine_id {
        builder.push(" AND medicine_id = ");
        builder.push_bind(medicine_id);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        builder.push(" AND order_status IN (");
        let mut list = builder.separated(", ");
        for status in statuses {
            list.push_bind(status);
        }
        list.push_unseparated(")");
    }
    if let Some(status) = query.payment_status {
        builder.push(" AND payment_status = ");
        builder.push_bind(status);
    }
    if let Some(session) = query.payment_session {
        builder.push(" AND payment_session = ");
        builder.push_bind(session);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Applies a partial update to an order. Only the fields set in the transition are written.
///
/// Returns `None` if the order does not exist.
pub async fn transition(
    id: i64,
    transition: OrderTransition,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    if transition.is_empty() {
        debug!("🗃️ No fields to update for order #{id}. Update request skipped.");
        return fetch_order(id, conn).await;
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = transition.order_status {
        set_clause.push("order_status = ");
        set_clause.push_bind_unseparated(status);
    }
    if let Some(status) = transition.payment_status {
        set_clause.push("payment_status = ");
        set_clause.push_bind_unseparated(status);
    }
    if let Some(method) = transition.payment_method {
        set_clause.push("payment_method = ");
        set_clause.push_bind_unseparated(method);
    }
    if let Some(address) = transition.address {
        set_clause.push("street = ");
        set_clause.push_bind_unseparated(address.street);
        set_clause.push("city = ");
        set_clause.push_bind_unseparated(address.city);
        set_clause.push("postal_code = ");
        set_clause.push_bind_unseparated(address.postal_code);
        set_clause.push("phone = ");
        set_clause.push_bind_unseparated(address.phone);
    }
    if let Some(prescription) = transition.prescription {
        set_clause.push("prescription = ");
        set_clause.push_bind_unseparated(prescription);
    }
    if let Some(session) = transition.payment_session {
        set_clause.push("payment_session = ");
        set_clause.push_bind_unseparated(session);
    }
    if let Some(txid) = transition.transaction_id {
        set_clause.push("transaction_id = ");
        set_clause.push_bind_unseparated(txid);
    }
    set_clause.push("updated_at = CURRENT_TIMESTAMP");
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    if let Some(o) = &order {
        trace!("🗃️ Order #{id} is now {}", o.state());
    }
    Ok(order)
}

/// Sets the quantity of a cart line. Settled orders are never changed. Returns `None` if `id` is not a pending line.
pub async fn set_pending_quantity(
    id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders SET quantity = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND order_status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Stamps a single cart line with a payment session. The line must still be pending with the quantity it had when
/// the payment amount was computed. Returns `false` (and writes nothing) otherwise.
pub async fn stamp_payment_line(
    line: &Order,
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET payment_session = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND user_id = $3 AND quantity = $4 AND order_status = 'Pending'
        "#,
    )
    .bind(session_id)
    .bind(line.id)
    .bind(&line.user_id)
    .bind(line.quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Detaches every pending line of the user from the payment session, so that the session can no longer settle them.
pub async fn release_payment_session(
    user_id: &str,
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET payment_session = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $1 AND payment_session = $2 AND order_status = 'Pending'
        "#,
    )
    .bind(user_id)
    .bind(session_id)
    .execute(conn)
    .await?;
    debug!("🗃️ {} cart lines of user {user_id} released from payment session {session_id}", result.rows_affected());
    Ok(result.rows_affected())
}

/// Marks every pending line of the payment session as `Cancelled` / `Failed`.
pub async fn fail_payment_session(
    user_id: &str,
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET order_status = $1, payment_status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $3 AND payment_session = $4 AND order_status = 'Pending'
        "#,
    )
    .bind(OrderStatusType::Cancelled)
    .bind(PaymentStatusType::Failed)
    .bind(user_id)
    .bind(session_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_pending_line(
    user_id: &str,
    medicine_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let result =
        sqlx::query("DELETE FROM orders WHERE user_id = $1 AND medicine_id = $2 AND order_status = 'Pending'")
            .bind(user_id)
            .bind(medicine_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// The user's cart lines joined with the current catalog data for each item.
pub async fn cart_items(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, StoreError> {
    let items = sqlx::query_as::<_, CartItem>(
        r#"
            SELECT
                o.*,
                m.name AS medicine_name,
                m.price AS unit_price,
                m.image AS image,
                m.stock AS stock
            FROM orders o LEFT JOIN medicines m ON m.id = o.medicine_id
            WHERE o.user_id = $1 AND o.order_status = 'Pending'
            ORDER BY o.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}
