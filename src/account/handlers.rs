use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{AccountQuery, AccountResponse, PreferencesResponse, UpdateAccountRequest},
    repo,
    repo_types::Account,
};
use crate::{
    auth::services::AuthUser,
    error::{AppError, AppJson, AppResult},
    planning::measurement::MeasurementSystem,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new().route("/account", get(get_account).put(update_account))
}

pub(crate) async fn load_account(state: &AppState, user_id: Uuid) -> AppResult<Account> {
    repo::find_account(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Stored preference, or a timezone guess that is saved for next time.
pub(crate) async fn resolve_measurement(
    state: &AppState,
    account: &Account,
    timezone: Option<&str>,
) -> AppResult<MeasurementSystem> {
    if let Some(system) = account.measurement_system {
        return Ok(system);
    }
    let guessed = MeasurementSystem::guess(timezone);
    repo::set_measurement_system(&state.db, account.id, guessed).await?;
    info!(user_id = %account.id, system = guessed.as_str(), "measurement system guessed");
    Ok(guessed)
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<AccountQuery>,
) -> AppResult<Json<AccountResponse>> {
    let account = load_account(&state, user_id).await?;
    let measurement_system = resolve_measurement(&state, &account, q.timezone.as_deref()).await?;
    let limits = state.config.limits.for_tier(account.tier).into();

    Ok(Json(AccountResponse {
        email: account.email,
        tier: account.tier,
        stripe_customer_id: account.stripe_customer_id,
        generations_today: account.generations_today,
        generations_reset_at: account.generations_reset_at,
        measurement_system,
        newsletter_subscribed: account.newsletter_subscribed,
        created_at: account.created_at,
        limits,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<UpdateAccountRequest>,
) -> AppResult<Json<PreferencesResponse>> {
    let updated = repo::update_preferences(
        &state.db,
        user_id,
        payload.measurement_system,
        payload.newsletter_subscribed,
    )
    .await?;

    info!(%user_id, "account preferences updated");
    Ok(Json(PreferencesResponse {
        measurement_system: updated.measurement_system,
        newsletter_subscribed: updated.newsletter_subscribed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::dto::TierLimitsView;
    use crate::account::repo_types::Tier;
    use crate::config::PlanLimits;

    #[test]
    fn limits_view_matches_tier() {
        let limits = PlanLimits::default();
        let view: TierLimitsView = limits.for_tier(Tier::Pro).into();
        assert_eq!(
            view,
            TierLimitsView { daily_generations: 3, max_plan_days: 30, max_members: 6 }
        );
    }

    #[test]
    fn update_request_accepts_partial_body() {
        let req: UpdateAccountRequest =
            serde_json::from_str(r#"{"measurement_system":"imperial"}"#).unwrap();
        assert_eq!(req.measurement_system, Some(MeasurementSystem::Imperial));
        assert!(req.newsletter_subscribed.is_none());
    }
}
