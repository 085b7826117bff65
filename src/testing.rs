//! Fixtures for database-backed tests.

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{auth::repo_types::User, household::repo::create_household_tx};

/// A FREE user with its household. Returns `(user_id, household_id)`.
pub(crate) async fn seed_account(pool: &PgPool, email: &str) -> (Uuid, Uuid) {
    let mut tx = pool.begin().await.unwrap();
    let user = User::create_tx(&mut tx, email, "not-a-real-hash")
        .await
        .unwrap()
        .unwrap();
    let household = create_household_tx(&mut tx, user.id).await.unwrap();
    tx.commit().await.unwrap();
    (user.id, household.id)
}

pub(crate) async fn set_generations(pool: &PgPool, user_id: Uuid, count: i32, reset_at: OffsetDateTime) {
    sqlx::query("UPDATE users SET generations_today = $2, generations_reset_at = $3 WHERE id = $1")
        .bind(user_id)
        .bind(count)
        .bind(reset_at)
        .execute(pool)
        .await
        .unwrap();
}

pub(crate) async fn generations(pool: &PgPool, user_id: Uuid) -> (i32, OffsetDateTime) {
    sqlx::query_as("SELECT generations_today, generations_reset_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
