use rust_decimal::Decimal;
use shared::menu_import::MatchedItem;
use shared::models::{MenuItem, MenuItemCreate, MenuItemUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::{PgConnection, PgPool};

const ITEM_COLUMNS: &str = "id, venue_id, name, description, price, category, is_available, display_order, pdf_page, pdf_x, pdf_y, pdf_width, pdf_height, created_at, updated_at";

pub async fn list(
    pool: &PgPool,
    venue_id: i64,
    available_only: bool,
) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as::<_, MenuItem>(&format!(
        r#"
        SELECT {ITEM_COLUMNS} FROM menu_items
        WHERE venue_id = $1 AND (NOT $2 OR is_available)
        ORDER BY category NULLS LAST, display_order, name
        "#
    ))
    .bind(venue_id)
    .bind(available_only)
    .fetch_all(pool)
    .await
}

/// Items of `venue_id` among `ids` (missing ids are simply absent)
pub(crate) async fn find_many(
    conn: &mut PgConnection,
    venue_id: i64,
    ids: &[i64],
) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items WHERE venue_id = $1 AND id = ANY($2)"
    ))
    .bind(venue_id)
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
}

/// Case-insensitive lookup by exact name
pub async fn find_by_name(
    pool: &PgPool,
    venue_id: i64,
    name: &str,
) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items WHERE venue_id = $1 AND lower(name) = lower($2) ORDER BY id LIMIT 1"
    ))
    .bind(venue_id)
    .bind(name.trim())
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    venue_id: i64,
    data: &MenuItemCreate,
) -> Result<MenuItem, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as::<_, MenuItem>(&format!(
        r#"
        INSERT INTO menu_items (id, venue_id, name, description, price, category, is_available,
                                display_order, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(venue_id)
    .bind(data.name.trim())
    .bind(data.description.as_deref())
    .bind(data.price.round_dp(2))
    .bind(data.category.as_deref())
    .bind(data.is_available.unwrap_or(true))
    .bind(data.display_order.unwrap_or(0))
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    venue_id: i64,
    item_id: i64,
    data: &MenuItemUpdate,
) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as::<_, MenuItem>(&format!(
        r#"
        UPDATE menu_items SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            price = COALESCE($5, price),
            category = COALESCE($6, category),
            is_available = COALESCE($7, is_available),
            display_order = COALESCE($8, display_order),
            updated_at = $9
        WHERE id = $1 AND venue_id = $2
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(item_id)
    .bind(venue_id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.description.as_deref())
    .bind(data.price.map(|p| p.round_dp(2)))
    .bind(data.category.as_deref())
    .bind(data.is_available)
    .bind(data.display_order)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, venue_id: i64, item_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1 AND venue_id = $2")
        .bind(item_id)
        .bind(venue_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Set availability of several items at once; returns the number changed
pub async fn set_availability(
    pool: &PgPool,
    venue_id: i64,
    item_ids: &[i64],
    available: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE menu_items SET is_available = $3, updated_at = $4 WHERE venue_id = $1 AND id = ANY($2)",
    )
    .bind(venue_id)
    .bind(item_ids)
    .bind(available)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Store imported items: existing items (same name) get the new position and
/// price, unknown names are inserted. Returns how many rows were written.
pub async fn save_imported(
    pool: &PgPool,
    venue_id: i64,
    matched: &[MatchedItem],
) -> Result<usize, sqlx::Error> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let mut saved = 0;

    for (index, m) in matched.iter().enumerate() {
        let name = m.item.name.trim();
        let pos = m.position.as_ref();
        let price = m.item.price.map(|p| p.round_dp(2));

        let updated = sqlx::query(
            r#"
            UPDATE menu_items SET
                price = COALESCE($3, price),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                pdf_page = COALESCE($6, pdf_page),
                pdf_x = COALESCE($7, pdf_x),
                pdf_y = COALESCE($8, pdf_y),
                pdf_width = COALESCE($9, pdf_width),
                pdf_height = COALESCE($10, pdf_height),
                updated_at = $11
            WHERE venue_id = $1 AND lower(name) = lower($2)
            "#,
        )
        .bind(venue_id)
        .bind(name)
        .bind(price)
        .bind(m.item.description.as_deref())
        .bind(m.item.category.as_deref())
        .bind(pos.map(|p| p.page))
        .bind(pos.map(|p| p.x))
        .bind(pos.map(|p| p.y))
        .bind(pos.map(|p| p.width))
        .bind(pos.map(|p| p.height))
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                r#"
                INSERT INTO menu_items (id, venue_id, name, description, price, category, is_available,
                                        display_order, pdf_page, pdf_x, pdf_y, pdf_width, pdf_height,
                                        created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9, $10, $11, $12, $13, $13)
                "#,
            )
            .bind(snowflake_id())
            .bind(venue_id)
            .bind(name)
            .bind(m.item.description.as_deref())
            .bind(price.unwrap_or(Decimal::ZERO))
            .bind(m.item.category.as_deref())
            .bind(index as i32)
            .bind(pos.map(|p| p.page))
            .bind(pos.map(|p| p.x))
            .bind(pos.map(|p| p.y))
            .bind(pos.map(|p| p.width))
            .bind(pos.map(|p| p.height))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        saved += 1;
    }

    tx.commit().await?;
    Ok(saved)
}
