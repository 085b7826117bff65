use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::PantryItem;

/// Newest first.
pub async fn list_items(db: &PgPool, household_id: Uuid) -> Result<Vec<PantryItem>, sqlx::Error> {
    sqlx::query_as::<_, PantryItem>(
        r#"
        SELECT id, household_id, name, category, created_at
        FROM pantry_items
        WHERE household_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(household_id)
    .fetch_all(db)
    .await
}

pub async fn insert_item(
    db: &PgPool,
    household_id: Uuid,
    name: &str,
    category: &str,
) -> Result<PantryItem, sqlx::Error> {
    sqlx::query_as::<_, PantryItem>(
        r#"
        INSERT INTO pantry_items (household_id, name, category)
        VALUES ($1, $2, $3)
        RETURNING id, household_id, name, category, created_at
        "#,
    )
    .bind(household_id)
    .bind(name)
    .bind(category)
    .fetch_one(db)
    .await
}

pub async fn delete_item(db: &PgPool, household_id: Uuid, item_id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM pantry_items WHERE id = $1 AND household_id = $2")
        .bind(item_id)
        .bind(household_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}
