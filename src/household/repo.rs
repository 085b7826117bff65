//! Household and member queries.
//!
//! Every lookup of a caller-supplied id takes the caller's `household_id`
//! as a required argument; rows outside that household are never returned.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    dto::CreateMemberRequest,
    repo_types::{Household, Member},
};

const MEMBER_COLUMNS: &str = r#"
    id, household_id, name, age_group, diet, allergies, dislikes, goals, sort_order, created_at
"#;

pub const DEFAULT_HOUSEHOLD_NAME: &str = "My Household";

pub async fn create_household_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Household, sqlx::Error> {
    sqlx::query_as::<_, Household>(
        r#"
        INSERT INTO households (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name, created_at
        "#,
    )
    .bind(user_id)
    .bind(DEFAULT_HOUSEHOLD_NAME)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> Result<Option<Household>, sqlx::Error> {
    sqlx::query_as::<_, Household>(
        r#"
        SELECT id, user_id, name, created_at
        FROM households
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn rename(db: &PgPool, user_id: Uuid, name: &str) -> Result<Option<Household>, sqlx::Error> {
    sqlx::query_as::<_, Household>(
        r#"
        UPDATE households SET name = $2
        WHERE user_id = $1
        RETURNING id, user_id, name, created_at
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(db)
    .await
}

/// Members in household order (`sort_order`, then creation time).
pub async fn list_members(db: &PgPool, household_id: Uuid) -> Result<Vec<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!(
        r#"
        SELECT {MEMBER_COLUMNS}
        FROM members
        WHERE household_id = $1
        ORDER BY sort_order ASC, created_at ASC
        "#
    ))
    .bind(household_id)
    .fetch_all(db)
    .await
}

/// Append a member at the end of the household order, unless the household
/// already has `max_members`. Returns `None` when the limit is reached.
pub async fn insert_member(
    db: &PgPool,
    household_id: Uuid,
    req: &CreateMemberRequest,
    max_members: i32,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!(
        r#"
        INSERT INTO members
            (household_id, name, age_group, diet, allergies, dislikes, goals, sort_order)
        SELECT $1, $2, $3, $4, $5, $6, $7, COUNT(*)::int
          FROM members
         WHERE household_id = $1
        HAVING COUNT(*) < $8
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(household_id)
    .bind(&req.name)
    .bind(req.age_group)
    .bind(req.diet)
    .bind(&req.allergies)
    .bind(&req.dislikes)
    .bind(&req.goals)
    .bind(max_members as i64)
    .fetch_optional(db)
    .await
}

pub async fn find_member(
    db: &PgPool,
    household_id: Uuid,
    member_id: Uuid,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1 AND household_id = $2"
    ))
    .bind(member_id)
    .bind(household_id)
    .fetch_optional(db)
    .await
}

pub async fn save_member(
    db: &PgPool,
    household_id: Uuid,
    member: &Member,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(&format!(
        r#"
        UPDATE members
           SET name = $3, age_group = $4, diet = $5, allergies = $6, dislikes = $7, goals = $8
         WHERE id = $1 AND household_id = $2
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(member.id)
    .bind(household_id)
    .bind(&member.name)
    .bind(member.age_group)
    .bind(member.diet)
    .bind(&member.allergies)
    .bind(&member.dislikes)
    .bind(&member.goals)
    .fetch_optional(db)
    .await
}

pub async fn delete_member(
    db: &PgPool,
    household_id: Uuid,
    member_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM members WHERE id = $1 AND household_id = $2")
        .bind(member_id)
        .bind(household_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}
