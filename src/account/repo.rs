use sqlx::{PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Account, Tier};
use crate::planning::{measurement::MeasurementSystem, quota::UsageCounter};

const ACCOUNT_COLUMNS: &str = r#"
    id, email, tier, stripe_customer_id,
    generations_today, generations_reset_at,
    shopping_emails_today, shopping_emails_reset_at,
    measurement_system, newsletter_subscribed, created_at
"#;

pub async fn find_account(db: &PgPool, user_id: Uuid) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn set_measurement_system(
    db: &PgPool,
    user_id: Uuid,
    system: MeasurementSystem,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET measurement_system = $2 WHERE id = $1")
        .bind(user_id)
        .bind(system)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn update_preferences(
    db: &PgPool,
    user_id: Uuid,
    measurement_system: Option<MeasurementSystem>,
    newsletter_subscribed: Option<bool>,
) -> Result<Account, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE users
           SET measurement_system = COALESCE($2, measurement_system),
               newsletter_subscribed = COALESCE($3, newsletter_subscribed)
         WHERE id = $1
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(measurement_system)
    .bind(newsletter_subscribed)
    .fetch_one(db)
    .await
}

/// Spend one unit of `counter` if the rolling window still has room.
///
/// Expired windows restart at 1 with `reset_at = now`; live windows are
/// incremented. The limit is enforced in the WHERE clause so concurrent
/// callers cannot both pass. Returns `false` when the limit was hit.
pub async fn consume_usage<'e, E>(
    executor: E,
    user_id: Uuid,
    counter: UsageCounter,
    limit: i32,
    now: OffsetDateTime,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let (count, reset) = counter.columns();
    let expired = format!("{reset} <= $2 - INTERVAL '24 hours'");
    let sql = format!(
        r#"
        UPDATE users
           SET {count} = CASE WHEN {expired} THEN 1 ELSE {count} + 1 END,
               {reset} = CASE WHEN {expired} THEN $2 ELSE {reset} END
         WHERE id = $1
           AND ({expired} OR {count} < $3)
        "#
    );
    let res = sqlx::query(&sql)
        .bind(user_id)
        .bind(now)
        .bind(limit)
        .execute(executor)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Upgrade to PRO by account id. Keeps a known customer id when none is given.
pub async fn upgrade_by_id(
    db: &PgPool,
    user_id: Uuid,
    customer_id: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        r#"
        UPDATE users
           SET tier = $2, stripe_customer_id = COALESCE($3, stripe_customer_id)
         WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(Tier::Pro)
    .bind(customer_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}

pub async fn upgrade_by_email(
    db: &PgPool,
    email: &str,
    customer_id: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        r#"
        UPDATE users
           SET tier = $2, stripe_customer_id = COALESCE($3, stripe_customer_id)
         WHERE email = $1
        "#,
    )
    .bind(email.to_lowercase())
    .bind(Tier::Pro)
    .bind(customer_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}

pub async fn set_tier_by_customer(
    db: &PgPool,
    customer_id: &str,
    tier: Tier,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE users SET tier = $2 WHERE stripe_customer_id = $1")
        .bind(customer_id)
        .bind(tier)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{generations, seed_account, set_generations};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-10-19 12:00 UTC);

    #[sqlx::test(migrations = "./migrations")]
    async fn expired_window_restarts_at_one(pool: PgPool) {
        let (user_id, _) = seed_account(&pool, "reset@example.com").await;
        set_generations(&pool, user_id, 5, NOW - time::Duration::hours(25)).await;

        assert!(consume_usage(&pool, user_id, UsageCounter::Generations, 1, NOW).await.unwrap());
        assert_eq!(generations(&pool, user_id).await, (1, NOW));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn window_at_limit_is_refused(pool: PgPool) {
        let (user_id, _) = seed_account(&pool, "full@example.com").await;
        let reset_at = NOW - time::Duration::hours(1);
        set_generations(&pool, user_id, 1, reset_at).await;

        assert!(!consume_usage(&pool, user_id, UsageCounter::Generations, 1, NOW).await.unwrap());
        assert_eq!(generations(&pool, user_id).await, (1, reset_at));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn live_window_increments_without_moving_reset(pool: PgPool) {
        let (user_id, _) = seed_account(&pool, "live@example.com").await;
        let reset_at = NOW - time::Duration::hours(2);
        set_generations(&pool, user_id, 1, reset_at).await;

        assert!(consume_usage(&pool, user_id, UsageCounter::Generations, 3, NOW).await.unwrap());
        assert_eq!(generations(&pool, user_id).await, (2, reset_at));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn window_of_exactly_24_hours_has_expired(pool: PgPool) {
        let (user_id, _) = seed_account(&pool, "edge@example.com").await;
        set_generations(&pool, user_id, 3, NOW - time::Duration::hours(24)).await;

        assert!(consume_usage(&pool, user_id, UsageCounter::Generations, 3, NOW).await.unwrap());
        assert_eq!(generations(&pool, user_id).await, (1, NOW));
    }
}
