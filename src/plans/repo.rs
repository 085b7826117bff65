use axum::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::{Plan, PlanDay, PlanDraft, PlanStatus, PlanSummary},
    services::PlanStore,
};
use crate::{account, planning::quota::UsageCounter, planning::schema::GeneratedDay};

const PLAN_COLUMNS: &str = r#"
    id, household_id, start_date, num_days, meals_enabled, use_it_up, status, created_at
"#;

pub async fn insert_placeholder(
    db: &PgPool,
    household_id: Uuid,
    draft: &PlanDraft,
) -> Result<Plan, sqlx::Error> {
    sqlx::query_as::<_, Plan>(&format!(
        r#"
        INSERT INTO plans (household_id, start_date, num_days, meals_enabled, use_it_up, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PLAN_COLUMNS}
        "#
    ))
    .bind(household_id)
    .bind(draft.start_date)
    .bind(draft.num_days)
    .bind(Json(&draft.slots))
    .bind(draft.use_it_up)
    .bind(PlanStatus::Generating)
    .fetch_one(db)
    .await
}

pub async fn set_status(db: &PgPool, plan_id: Uuid, status: PlanStatus) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE plans SET status = $2 WHERE id = $1")
        .bind(plan_id)
        .bind(status)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_plans(db: &PgPool, household_id: Uuid) -> Result<Vec<PlanSummary>, sqlx::Error> {
    sqlx::query_as::<_, PlanSummary>(
        r#"
        SELECT p.id, p.start_date, p.num_days, p.use_it_up, p.status, p.created_at,
               COUNT(d.id) AS day_count
          FROM plans p
          LEFT JOIN plan_days d ON d.plan_id = p.id
         WHERE p.household_id = $1
         GROUP BY p.id
         ORDER BY p.created_at DESC
        "#,
    )
    .bind(household_id)
    .fetch_all(db)
    .await
}

pub async fn find_plan(
    db: &PgPool,
    household_id: Uuid,
    plan_id: Uuid,
) -> Result<Option<Plan>, sqlx::Error> {
    sqlx::query_as::<_, Plan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1 AND household_id = $2"
    ))
    .bind(plan_id)
    .bind(household_id)
    .fetch_optional(db)
    .await
}

/// Days of a plan already scoped through `find_plan`.
pub async fn list_days(db: &PgPool, plan_id: Uuid) -> Result<Vec<PlanDay>, sqlx::Error> {
    sqlx::query_as::<_, PlanDay>(
        r#"
        SELECT id, plan_id, day_index, meals
          FROM plan_days
         WHERE plan_id = $1
         ORDER BY day_index ASC
        "#,
    )
    .bind(plan_id)
    .fetch_all(db)
    .await
}

pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn create_placeholder(&self, household_id: Uuid, draft: &PlanDraft) -> Result<Uuid, sqlx::Error> {
        Ok(insert_placeholder(&self.db, household_id, draft).await?.id)
    }

    async fn commit_ready(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        days: &[GeneratedDay],
        limit: i32,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.db.begin().await?;

        for day in days {
            sqlx::query("INSERT INTO plan_days (plan_id, day_index, meals) VALUES ($1, $2, $3)")
                .bind(plan_id)
                .bind(day.day_index)
                .bind(Json(&day.meals))
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE plans SET status = $2 WHERE id = $1")
            .bind(plan_id)
            .bind(PlanStatus::Ready)
            .execute(&mut *tx)
            .await?;

        let consumed =
            account::repo::consume_usage(&mut *tx, user_id, UsageCounter::Generations, limit, now).await?;
        if !consumed {
            // dropping tx rolls back the day inserts
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn mark_failed(&self, plan_id: Uuid) -> Result<(), sqlx::Error> {
        set_status(&self.db, plan_id, PlanStatus::Failed).await
    }
}
