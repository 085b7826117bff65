use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::{
    stripe::{select_subscription, BillingError, Buyer, StripeClient, SubscriptionView},
    webhook::{interpret_event, verify_signature, TierChange},
};
use crate::{
    account::{handlers::load_account, repo, repo_types::Tier},
    auth::services::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/billing/checkout", post(checkout))
        .route("/billing/subscription", get(subscription))
        .route("/billing/cancel", post(cancel))
        .route("/webhooks/stripe", post(stripe_webhook))
}

fn stripe(state: &AppState) -> AppResult<Arc<StripeClient>> {
    state
        .stripe
        .clone()
        .ok_or_else(|| AppError::UpstreamUnavailable("Stripe is not configured.".into()))
}

fn upstream(message: &'static str) -> impl FnOnce(BillingError) -> AppError {
    move |e| {
        error!(error = %e, "{message}");
        AppError::UpstreamUnavailable(message.into())
    }
}

#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Value>> {
    let stripe = stripe(&state)?;
    let price_id = stripe
        .pro_price_id
        .as_deref()
        .ok_or_else(|| AppError::UpstreamUnavailable("Stripe is not configured.".into()))?;

    let account = load_account(&state, user_id).await?;
    if account.tier == Tier::Pro {
        return Err(AppError::validation("You are already on Pro."));
    }

    let buyer = match account.stripe_customer_id.as_deref() {
        Some(customer) => Buyer::Customer(customer),
        None => Buyer::Email(&account.email),
    };
    let url = stripe
        .create_checkout_session(price_id, user_id, buyer, &state.config.app_url)
        .await
        .map_err(upstream("Failed to create checkout session."))?;

    info!(%user_id, "checkout started");
    Ok(Json(json!({ "url": url })))
}

#[instrument(skip(state))]
pub async fn subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<SubscriptionView>> {
    let stripe = stripe(&state)?;
    let account = load_account(&state, user_id).await?;
    let Some(customer_id) = account.stripe_customer_id else {
        return Ok(Json(SubscriptionView::from(None)));
    };

    let subscriptions = stripe
        .list_subscriptions(&customer_id)
        .await
        .map_err(upstream("Failed to load subscription details."))?;
    Ok(Json(SubscriptionView::from(select_subscription(subscriptions).as_ref())))
}

#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<SubscriptionView>> {
    let stripe = stripe(&state)?;
    let account = load_account(&state, user_id).await?;
    let customer_id = match (account.tier, account.stripe_customer_id) {
        (Tier::Pro, Some(id)) => id,
        _ => return Err(AppError::NotFound("Active Pro subscription")),
    };

    let current = stripe
        .list_subscriptions(&customer_id)
        .await
        .map_err(upstream("Failed to schedule cancellation."))
        .map(select_subscription)?
        .ok_or(AppError::NotFound("Active subscription"))?;

    if current.cancel_at_period_end {
        return Ok(Json(SubscriptionView::from(Some(&current))));
    }

    let updated = stripe
        .schedule_cancel(&current.id)
        .await
        .map_err(upstream("Failed to schedule cancellation."))?;
    info!(%user_id, subscription_id = %updated.id, "cancellation scheduled");
    Ok(Json(SubscriptionView::from(Some(&updated))))
}

/// Unauthenticated; trust comes from the signature alone.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let secret = state
        .config
        .stripe
        .as_ref()
        .and_then(|s| s.webhook_secret.as_deref());
    let signature = headers.get("stripe-signature").and_then(|v| v.to_str().ok());
    let (Some(secret), Some(signature)) = (secret, signature) else {
        return Err(AppError::validation("Missing signature"));
    };

    verify_signature(signature, &body, secret, OffsetDateTime::now_utc().unix_timestamp()).map_err(|e| {
        warn!(error = %e, "webhook signature rejected");
        AppError::validation("Invalid signature")
    })?;

    let change = interpret_event(&body).map_err(|e| AppError::validation(e.to_string()))?;
    let rows = match &change {
        TierChange::ProByUser { user_id, customer_id } => {
            repo::upgrade_by_id(&state.db, *user_id, customer_id.as_deref()).await?
        }
        TierChange::ProByEmail { email, customer_id } => {
            repo::upgrade_by_email(&state.db, email, customer_id.as_deref()).await?
        }
        TierChange::ProByCustomer { customer_id } => {
            repo::set_tier_by_customer(&state.db, customer_id, Tier::Pro).await?
        }
        TierChange::FreeByCustomer { customer_id } => {
            repo::set_tier_by_customer(&state.db, customer_id, Tier::Free).await?
        }
        TierChange::Ignore => 0,
    };

    info!(?change, rows, "stripe webhook handled");
    Ok(Json(json!({ "received": true })))
}
