use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::planning::{
    measurement::MeasurementSystem,
    quota::{UsageCounter, UsageWindow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

/// Billing and usage view of a `users` row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub tier: Tier,
    pub stripe_customer_id: Option<String>,
    pub generations_today: i32,
    pub generations_reset_at: OffsetDateTime,
    pub shopping_emails_today: i32,
    pub shopping_emails_reset_at: OffsetDateTime,
    pub measurement_system: Option<MeasurementSystem>,
    pub newsletter_subscribed: bool,
    pub created_at: OffsetDateTime,
}

impl Account {
    pub fn usage(&self, counter: UsageCounter) -> UsageWindow {
        match counter {
            UsageCounter::Generations => UsageWindow {
                count: self.generations_today,
                reset_at: self.generations_reset_at,
            },
            UsageCounter::ShoppingEmails => UsageWindow {
                count: self.shopping_emails_today,
                reset_at: self.shopping_emails_reset_at,
            },
        }
    }
}
