use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};
use uuid::Uuid;

use super::repo_types::{Plan, PlanDay, PlanDraft, PlanStatus};
use crate::{
    error::AppError,
    household::repo_types::Member,
    planning::{
        shopping::AggregatedItem,
        slots::{default_slots, SlotConfig},
    },
};

pub const MAX_DAYS: i32 = 31;

/// Accepts both snake_case and the camelCase names older clients send.
#[derive(Debug, Deserialize)]
pub struct GeneratePlanRequest {
    #[serde(alias = "startDate")]
    pub start_date: String,
    #[serde(alias = "numDays")]
    pub num_days: i32,
    #[serde(default = "default_slots", alias = "mealsEnabled")]
    pub meals_enabled: SlotConfig,
    #[serde(default, alias = "useItUpMode")]
    pub use_it_up: bool,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl GeneratePlanRequest {
    pub fn to_draft(&self) -> Result<PlanDraft, AppError> {
        let start_date = Date::parse(self.start_date.trim(), format_description!("[year]-[month]-[day]"))
            .map_err(|_| AppError::validation("Invalid date"))?;

        if !(1..=MAX_DAYS).contains(&self.num_days) {
            return Err(AppError::validation(format!(
                "num_days must be between 1 and {MAX_DAYS}"
            )));
        }

        Ok(PlanDraft {
            start_date,
            num_days: self.num_days,
            slots: self.meals_enabled.clone(),
            use_it_up: self.use_it_up,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct GeneratePlanResponse {
    pub plan_id: Uuid,
    pub status: PlanStatus,
}

#[derive(Debug, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,
    pub days: Vec<PlanDay>,
    pub members: Vec<Member>,
}

#[derive(Debug, Serialize)]
pub struct ShoppingListResponse {
    pub plan_id: Uuid,
    pub categories: BTreeMap<String, Vec<AggregatedItem>>,
    pub total_items: usize,
}
