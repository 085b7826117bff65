use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::account::repo_types::Tier;

/// Credential view of a `users` row. Everything else lives on `Account`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub tier: Tier,
    pub created_at: OffsetDateTime,
}
