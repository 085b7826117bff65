use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::Tier;
use crate::{config::TierLimits, planning::measurement::MeasurementSystem};

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub email: String,
    pub tier: Tier,
    pub stripe_customer_id: Option<String>,
    pub generations_today: i32,
    pub generations_reset_at: OffsetDateTime,
    pub measurement_system: MeasurementSystem,
    pub newsletter_subscribed: bool,
    pub created_at: OffsetDateTime,
    pub limits: TierLimitsView,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TierLimitsView {
    pub daily_generations: i32,
    pub max_plan_days: i32,
    pub max_members: i32,
}

impl From<&TierLimits> for TierLimitsView {
    fn from(l: &TierLimits) -> Self {
        Self {
            daily_generations: l.daily_generations,
            max_plan_days: l.max_plan_days,
            max_members: l.max_members,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub measurement_system: Option<MeasurementSystem>,
    pub newsletter_subscribed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub measurement_system: Option<MeasurementSystem>,
    pub newsletter_subscribed: bool,
}
