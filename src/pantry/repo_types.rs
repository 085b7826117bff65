use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PantryItem {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub category: String,
    pub created_at: OffsetDateTime,
}
