use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::planning::diet::Diet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AgeGroup {
    #[default]
    Adult,
    Teen,
    Child,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Household {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub age_group: AgeGroup,
    pub diet: Diet,
    pub allergies: Vec<String>,
    pub dislikes: Vec<String>,
    pub goals: Vec<String>,
    pub sort_order: i32,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
pub(crate) fn test_member(name: &str, diet: Diet) -> Member {
    Member {
        id: Uuid::new_v4(),
        household_id: Uuid::nil(),
        name: name.to_string(),
        age_group: AgeGroup::Adult,
        diet,
        allergies: vec![],
        dislikes: vec![],
        goals: vec![],
        sort_order: 0,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}
