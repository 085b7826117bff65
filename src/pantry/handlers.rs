use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{dto::CreatePantryItemRequest, repo, repo_types::PantryItem};
use crate::{
    account::{handlers::load_account, repo_types::Tier},
    auth::services::AuthUser,
    error::{AppError, AppJson, AppResult},
    household::handlers::load_household,
    state::AppState,
};

pub fn pantry_routes() -> Router<AppState> {
    Router::new()
        .route("/pantry", get(list_items).post(create_item))
        .route("/pantry/:id", delete(delete_item))
}

async fn require_pro(state: &AppState, user_id: Uuid) -> AppResult<()> {
    let account = load_account(state, user_id).await?;
    if account.tier != Tier::Pro {
        return Err(AppError::Forbidden("Pantry is a Pro feature.".into()));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<PantryItem>>> {
    require_pro(&state, user_id).await?;
    let household = load_household(&state, user_id).await?;
    Ok(Json(repo::list_items(&state.db, household.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<CreatePantryItemRequest>,
) -> AppResult<(StatusCode, Json<PantryItem>)> {
    require_pro(&state, user_id).await?;
    let household = load_household(&state, user_id).await?;
    payload.validate()?;

    let item = repo::insert_item(&state.db, household.id, payload.name.trim(), &payload.category).await?;
    info!(%user_id, item_id = %item.id, "pantry item added");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Deleting stays available after a downgrade so stale items can be cleared.
#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let household = load_household(&state, user_id).await?;
    if !repo::delete_item(&state.db, household.id, id).await? {
        return Err(AppError::NotFound("Item"));
    }
    Ok(Json(json!({ "success": true })))
}
