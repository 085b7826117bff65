use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateMemberRequest, HouseholdResponse, UpdateHouseholdRequest, UpdateMemberRequest},
    repo,
    repo_types::{Household, Member},
};
use crate::{
    account::{handlers::load_account, repo_types::Tier},
    auth::services::AuthUser,
    error::{AppError, AppJson, AppResult},
    state::AppState,
};

pub fn household_routes() -> Router<AppState> {
    Router::new()
        .route("/household", get(get_household).put(update_household))
        .route("/members", get(list_members).post(create_member))
        .route("/members/:id", put(update_member).delete(delete_member))
}

/// The caller's household; every scoped query starts here.
pub(crate) async fn load_household(state: &AppState, user_id: Uuid) -> AppResult<Household> {
    repo::find_by_user(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("Household"))
}

#[instrument(skip(state))]
pub async fn get_household(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<HouseholdResponse>> {
    let household = load_household(&state, user_id).await?;
    let members = repo::list_members(&state.db, household.id).await?;
    Ok(Json(HouseholdResponse { household, members }))
}

#[instrument(skip(state, payload))]
pub async fn update_household(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<UpdateHouseholdRequest>,
) -> AppResult<Json<Household>> {
    payload.validate()?;
    let household = repo::rename(&state.db, user_id, payload.name.trim())
        .await?
        .ok_or(AppError::NotFound("Household"))?;
    Ok(Json(household))
}

#[instrument(skip(state))]
pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Member>>> {
    let household = load_household(&state, user_id).await?;
    Ok(Json(repo::list_members(&state.db, household.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<CreateMemberRequest>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let account = load_account(&state, user_id).await?;
    let household = load_household(&state, user_id).await?;
    payload.validate()?;

    let max_members = state.config.limits.for_tier(account.tier).max_members;
    let Some(member) = repo::insert_member(&state.db, household.id, &payload, max_members).await? else {
        warn!(%user_id, max_members, "member limit reached");
        let hint = match account.tier {
            Tier::Free => " Upgrade to Pro for more.",
            Tier::Pro => "",
        };
        return Err(AppError::Forbidden(format!(
            "Member limit reached ({max_members}).{hint}"
        )));
    };

    info!(%user_id, member_id = %member.id, "member added");
    Ok((StatusCode::CREATED, Json(member)))
}

#[instrument(skip(state, payload))]
pub async fn update_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateMemberRequest>,
) -> AppResult<Json<Member>> {
    let household = load_household(&state, user_id).await?;
    let mut member = repo::find_member(&state.db, household.id, id)
        .await?
        .ok_or(AppError::NotFound("Member"))?;
    payload.validate()?;
    payload.apply(&mut member);

    let saved = repo::save_member(&state.db, household.id, &member)
        .await?
        .ok_or(AppError::NotFound("Member"))?;
    Ok(Json(saved))
}

#[instrument(skip(state))]
pub async fn delete_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let household = load_household(&state, user_id).await?;
    if !repo::delete_member(&state.db, household.id, id).await? {
        return Err(AppError::NotFound("Member"));
    }
    info!(%user_id, member_id = %id, "member removed");
    Ok(Json(json!({ "success": true })))
}
