use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{GeneratePlanRequest, GeneratePlanResponse, PlanDetail, ShoppingListResponse},
    repo::{self, PgPlanStore},
    repo_types::{Plan, PlanDay, PlanStatus, PlanSummary},
    services::{self, PlanContext},
};
use crate::{
    account::{
        handlers::{load_account, resolve_measurement},
        repo::consume_usage,
        repo_types::Tier,
    },
    auth::services::AuthUser,
    error::{AppError, AppJson, AppResult},
    household::{self, handlers::load_household},
    pantry,
    planning::{
        quota::{quota_exceeded, UsageCounter},
        shopping::{aggregate_shopping_list, ShoppingList},
    },
    state::AppState,
};

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/plans/generate", post(generate))
        .route("/plans/:id", get(get_plan))
        .route("/plans/:id/shopping-list", get(shopping_list))
        .route("/plans/:id/shopping-list/email", post(email_shopping_list))
}

async fn load_plan(state: &AppState, user_id: Uuid, plan_id: Uuid) -> AppResult<(Plan, Vec<PlanDay>)> {
    let household = load_household(state, user_id).await?;
    let plan = repo::find_plan(&state.db, household.id, plan_id)
        .await?
        .ok_or(AppError::NotFound("Plan"))?;
    let days = repo::list_days(&state.db, plan.id).await?;
    Ok((plan, days))
}

fn shopping_list_of(days: &[PlanDay]) -> ShoppingList {
    aggregate_shopping_list(days.iter().map(|d| &d.meals.0))
}

#[instrument(skip(state, payload))]
pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<GeneratePlanRequest>,
) -> AppResult<(StatusCode, Json<GeneratePlanResponse>)> {
    let account = load_account(&state, user_id).await?;
    let draft = payload.to_draft()?;
    let usage = account.usage(UsageCounter::Generations);
    services::admit(&state.config.limits, account.tier, &usage, draft.num_days, OffsetDateTime::now_utc())?;
    let measurement = resolve_measurement(&state, &account, payload.timezone.as_deref()).await?;

    let household = load_household(&state, user_id).await?;
    let members = household::repo::list_members(&state.db, household.id).await?;
    let pantry = if draft.use_it_up && account.tier == Tier::Pro {
        pantry::repo::list_items(&state.db, household.id)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect()
    } else {
        Vec::new()
    };

    let ctx = PlanContext {
        user_id,
        household_id: household.id,
        tier: account.tier,
        usage,
        measurement,
        members,
        pantry,
    };

    let store = PgPlanStore::new(state.db.clone());
    let plan_id = services::generate_plan(
        &store,
        state.llm.as_ref(),
        &state.config.limits,
        ctx,
        draft,
        OffsetDateTime::now_utc(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(GeneratePlanResponse { plan_id, status: PlanStatus::Ready }),
    ))
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<PlanSummary>>> {
    let household = load_household(&state, user_id).await?;
    Ok(Json(repo::list_plans(&state.db, household.id).await?))
}

#[instrument(skip(state))]
pub async fn get_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PlanDetail>> {
    let (plan, days) = load_plan(&state, user_id, id).await?;
    let members = household::repo::list_members(&state.db, plan.household_id).await?;
    Ok(Json(PlanDetail { plan, days, members }))
}

#[instrument(skip(state))]
pub async fn shopping_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ShoppingListResponse>> {
    let (plan, days) = load_plan(&state, user_id, id).await?;
    let list = shopping_list_of(&days);
    Ok(Json(ShoppingListResponse {
        plan_id: plan.id,
        categories: list.grouped,
        total_items: list.total_items,
    }))
}

/// The email counter is spent only after the message was handed to SMTP.
#[instrument(skip(state))]
pub async fn email_shopping_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let account = load_account(&state, user_id).await?;
    let limit = state.config.limits.for_tier(account.tier).daily_generations;
    let now = OffsetDateTime::now_utc();
    account
        .usage(UsageCounter::ShoppingEmails)
        .check(UsageCounter::ShoppingEmails, account.tier, limit, now)?;

    let mailer = state.mailer.as_ref().ok_or(AppError::DeliveryUnavailable)?;

    let (plan, days) = load_plan(&state, user_id, id).await?;
    let list = shopping_list_of(&days);
    if list.is_empty() {
        return Err(AppError::validation("This plan has no shopping items to email."));
    }

    let email = services::shopping_email(&plan, &list, &state.config.app_url);
    mailer
        .send(&account.email, &email.subject, &email.body)
        .await
        .map_err(|e| AppError::DeliveryFailed(e.to_string()))?;

    let consumed = consume_usage(&state.db, user_id, UsageCounter::ShoppingEmails, limit, now).await?;
    if !consumed {
        warn!(%user_id, plan_id = %plan.id, "email sent but usage window filled concurrently");
        return Err(quota_exceeded(UsageCounter::ShoppingEmails, account.tier, limit));
    }

    let used = account.usage(UsageCounter::ShoppingEmails).consume(now).count;
    info!(%user_id, plan_id = %plan.id, items = list.total_items, used, limit, "shopping list emailed");
    Ok(Json(json!({ "ok": true })))
}
