use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::planning::{schema::DayMeals, slots::SlotConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PlanStatus {
    Generating,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub household_id: Uuid,
    pub start_date: Date,
    pub num_days: i32,
    pub meals_enabled: Json<SlotConfig>,
    pub use_it_up: bool,
    pub status: PlanStatus,
    pub created_at: OffsetDateTime,
}

/// A plan row with its stored day count, for listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlanSummary {
    pub id: Uuid,
    pub start_date: Date,
    pub num_days: i32,
    pub use_it_up: bool,
    pub status: PlanStatus,
    pub created_at: OffsetDateTime,
    pub day_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlanDay {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub day_index: i32,
    pub meals: Json<DayMeals>,
}

/// Everything stored with a new plan before generation starts.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub start_date: Date,
    pub num_days: i32,
    pub slots: SlotConfig,
    pub use_it_up: bool,
}
