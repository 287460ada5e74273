use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Medicine, MedicineUpdate, NewMedicine},
    traits::{DecrementResult, StoreError},
};

pub async fn insert_medicine(medicine: NewMedicine, conn: &mut SqliteConnection) -> Result<Medicine, StoreError> {
    let record = sqlx::query_as::<_, Medicine>(
        r#"
            INSERT INTO medicines (name, description, price, stock, category, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(medicine.name)
    .bind(medicine.description)
    .bind(medicine.price)
    .bind(medicine.stock)
    .bind(medicine.category)
    .bind(medicine.image)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Medicine #{} ({}) added to the catalog", record.id, record.name);
    Ok(record)
}

pub async fn fetch_medicine(id: i64, conn: &mut SqliteConnection) -> Result<Option<Medicine>, StoreError> {
    let medicine =
        sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(medicine)
}

/// Updates the catalog columns set in `update`. Stock is not touched here; see [`adjust_stock`].
///
/// Returns `None` if the medicine does not exist.
pub async fn update_medicine_fields(
    id: i64,
    update: &MedicineUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Medicine>, StoreError> {
    if update.has_no_field_changes() {
        trace!("🗃️ No catalog fields to update for medicine #{id}.");
        return fetch_medicine(id, conn).await;
    }
    let mut builder = QueryBuilder::new("UPDATE medicines SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = &update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name.clone());
    }
    if let Some(description) = &update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description.clone());
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(category) = &update.category {
        set_clause.push("category = ");
        set_clause.push_bind_unseparated(category.clone());
    }
    if let Some(image) = &update.image {
        set_clause.push("image = ");
        set_clause.push_bind_unseparated(image.clone());
    }
    set_clause.push("updated_at = CURRENT_TIMESTAMP");
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let medicine = builder.build_query_as::<Medicine>().fetch_optional(conn).await?;
    Ok(medicine)
}

pub async fn delete_medicine(id: i64, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM medicines WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Returns one page of medicines whose name contains `search` (ASCII case-insensitive), ordered by name, along with
/// the total number of matches.
pub async fn search_medicines(
    search: Option<&str>,
    page: i64,
    page_size: i64,
    conn: &mut SqliteConnection,
) -> Result<(Vec<Medicine>, i64), StoreError> {
    let pattern = search.map(|s| format!("%{}%", s.to_lowercase()));
    let offset = (page.max(1) - 1) * page_size;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM medicines");
    if let Some(p) = &pattern {
        count.push(" WHERE lower(name) LIKE ");
        count.push_bind(p.clone());
    }
    let (total,): (i64,) = count.build_query_as().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM medicines");
    if let Some(p) = pattern {
        builder.push(" WHERE lower(name) LIKE ");
        builder.push_bind(p);
    }
    builder.push(" ORDER BY name ASC, id ASC LIMIT ");
    builder.push_bind(page_size);
    builder.push(" OFFSET ");
    builder.push_bind(offset);
    let medicines = builder.build_query_as::<Medicine>().fetch_all(conn).await?;
    trace!("🗃️ Medicine search returned {} of {total} matches", medicines.len());
    Ok((medicines, total))
}

/// Removes `amount` units from the medicine's stock.
///
/// The check and the decrement are a single conditional `UPDATE`, so two callers racing for the last units can never
/// both succeed. The stock value used is whatever is current at the moment of the write, never one read earlier.
pub async fn try_decrement(id: i64, amount: i64, conn: &mut SqliteConnection) -> Result<DecrementResult, StoreError> {
    let remaining: Option<(i64,)> = sqlx::query_as(
        r#"
            UPDATE medicines SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock >= $1
            RETURNING stock;
        "#,
    )
    .bind(amount)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some((remaining,)) = remaining {
        trace!("🗃️ Stock for medicine #{id} decremented by {amount}. {remaining} left");
        return Ok(DecrementResult::Decremented(remaining));
    }
    match fetch_medicine(id, conn).await? {
        Some(m) => {
            debug!("🗃️ Cannot take {amount} units of {} (#{id}). Only {} in stock", m.name, m.stock);
            Ok(DecrementResult::InsufficientStock { name: m.name, remaining: m.stock })
        },
        None => Ok(DecrementResult::NotFound),
    }
}

/// Adds `delta` units to stock (or removes them, if negative) as long as the result is not negative.
/// Returns the new stock level.
pub async fn adjust_stock(id: i64, delta: i64, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let stock: Option<(i64,)> = sqlx::query_as(
        r#"
            UPDATE medicines SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock + $1 >= 0
            RETURNING stock;
        "#,
    )
    .bind(delta)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match stock {
        Some((stock,)) => {
            debug!("🗃️ Stock for medicine #{id} adjusted by {delta}. New level: {stock}");
            Ok(stock)
        },
        None => match fetch_medicine(id, conn).await? {
            Some(m) => Err(StoreError::InsufficientStock { medicine_id: id, name: m.name, remaining: m.stock }),
            None => Err(StoreError::MedicineNotFound(id)),
        },
    }
}
