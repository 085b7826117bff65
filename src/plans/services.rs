//! Plan generation orchestration.
//!
//! A plan is written in two phases: a `generating` placeholder first, then
//! (after the completion call) one transaction holding every day, the flip
//! to `ready` and the generation counter bump. Any failure after the
//! placeholder leaves it `failed` with no days and the counter untouched.

use axum::async_trait;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo_types::{Plan, PlanDraft};
use crate::{
    account::repo_types::Tier,
    config::PlanLimits,
    error::{AppError, AppResult},
    household::repo_types::Member,
    llm::CompletionClient,
    planning::{
        constraints::build_constraints,
        measurement::MeasurementSystem,
        prompt::GenerationRequest,
        quota::{quota_exceeded, UsageCounter, UsageWindow},
        schema::{parse_plan, GeneratedDay},
        shopping::{render_text, ShoppingList},
        slots::normalize_meals,
    },
};

/// Persistence used by `generate_plan`.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn create_placeholder(&self, household_id: Uuid, draft: &PlanDraft) -> Result<Uuid, sqlx::Error>;

    /// Writes the days, marks the plan ready and spends one generation, all
    /// or nothing. `Ok(false)` means the quota ran out and nothing was written.
    async fn commit_ready(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        days: &[GeneratedDay],
        limit: i32,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error>;

    async fn mark_failed(&self, plan_id: Uuid) -> Result<(), sqlx::Error>;
}

/// Who is generating, as loaded by the handler.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub user_id: Uuid,
    pub household_id: Uuid,
    pub tier: Tier,
    pub usage: UsageWindow,
    pub measurement: MeasurementSystem,
    pub members: Vec<Member>,
    pub pantry: Vec<String>,
}

/// Tier gates checked before anything is written: the generation window
/// and the plan length.
pub fn admit(
    limits: &PlanLimits,
    tier: Tier,
    usage: &UsageWindow,
    num_days: i32,
    now: OffsetDateTime,
) -> AppResult<()> {
    let tier_limits = limits.for_tier(tier);
    usage.check(UsageCounter::Generations, tier, tier_limits.daily_generations, now)?;

    if num_days > tier_limits.max_plan_days {
        return Err(AppError::Forbidden(format!(
            "Max {} days for {} tier.",
            tier_limits.max_plan_days,
            tier_name(tier)
        )));
    }
    Ok(())
}

pub async fn generate_plan(
    store: &dyn PlanStore,
    client: &dyn CompletionClient,
    limits: &PlanLimits,
    ctx: PlanContext,
    mut draft: PlanDraft,
    now: OffsetDateTime,
) -> AppResult<Uuid> {
    admit(limits, ctx.tier, &ctx.usage, draft.num_days, now)?;
    let daily_limit = limits.for_tier(ctx.tier).daily_generations;

    if ctx.members.is_empty() {
        return Err(AppError::validation(
            "Add at least one household member before generating a plan.",
        ));
    }

    draft.use_it_up = draft.use_it_up && ctx.tier == Tier::Pro;

    let request = GenerationRequest {
        constraints: build_constraints(&ctx.members),
        slots: draft.slots.clone(),
        num_days: draft.num_days,
        measurement: ctx.measurement,
        pantry_items: draft.use_it_up.then(|| ctx.pantry.clone()),
    };

    let plan_id = store.create_placeholder(ctx.household_id, &draft).await?;

    match run_generation(store, client, &ctx, &request, plan_id, daily_limit, now).await {
        Ok(days) => {
            let used = ctx.usage.consume(now).count;
            info!(user_id = %ctx.user_id, %plan_id, days, used, limit = daily_limit, "plan ready");
            Ok(plan_id)
        }
        Err(e) => {
            warn!(user_id = %ctx.user_id, %plan_id, error = %e, "plan generation failed");
            if let Err(mark_err) = store.mark_failed(plan_id).await {
                warn!(%plan_id, error = %mark_err, "could not mark plan failed");
            }
            Err(e)
        }
    }
}

async fn run_generation(
    store: &dyn PlanStore,
    client: &dyn CompletionClient,
    ctx: &PlanContext,
    request: &GenerationRequest,
    plan_id: Uuid,
    daily_limit: i32,
    now: OffsetDateTime,
) -> AppResult<usize> {
    let content = client
        .complete(&request.to_prompt())
        .await
        .map_err(|e| AppError::GenerationFailed(e.to_string()))?;

    let generated = parse_plan(&content).map_err(|e| AppError::GenerationFailed(e.to_string()))?;

    let days: Vec<GeneratedDay> = generated
        .days
        .into_iter()
        .map(|day| GeneratedDay {
            day_index: day.day_index,
            meals: normalize_meals(day.meals, &request.slots),
        })
        .collect();

    if !store
        .commit_ready(plan_id, ctx.user_id, &days, daily_limit, now)
        .await?
    {
        return Err(quota_exceeded(UsageCounter::Generations, ctx.tier, daily_limit));
    }
    Ok(days.len())
}

fn tier_name(tier: Tier) -> &'static str {
    match tier {
        Tier::Free => "FREE",
        Tier::Pro => "PRO",
    }
}

pub struct ShoppingEmail {
    pub subject: String,
    pub body: String,
}

pub fn shopping_email(plan: &Plan, list: &ShoppingList, app_url: &str) -> ShoppingEmail {
    let link = format!(
        "{}/dashboard/plans/{}/shopping",
        app_url.trim_end_matches('/'),
        plan.id
    );
    let body = [
        format!("Your shopping list for a {}-day plan", plan.num_days),
        String::new(),
        render_text(list),
        String::new(),
        format!("Open in the app: {link}"),
    ]
    .join("\n");

    ShoppingEmail {
        subject: format!("Shopping list ({}-day plan)", plan.num_days),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::household::repo_types::test_member;
    use crate::llm::GenerationError;
    use crate::planning::{diet::Diet, schema::DayMeals, shopping::aggregate_shopping_list, slots::default_slots};
    use crate::plans::repo_types::PlanStatus;
    use sqlx::types::Json;
    use std::sync::Mutex;
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2026-10-19 12:00 UTC);

    #[derive(Default)]
    struct FakeStore {
        placeholders: Mutex<Vec<PlanDraft>>,
        committed: Mutex<Vec<GeneratedDay>>,
        failed: Mutex<Vec<Uuid>>,
        quota_left: Mutex<i32>,
    }

    impl FakeStore {
        fn with_quota(n: i32) -> Self {
            let store = Self::default();
            *store.quota_left.lock().unwrap() = n;
            store
        }
    }

    #[async_trait]
    impl PlanStore for FakeStore {
        async fn create_placeholder(&self, _h: Uuid, draft: &PlanDraft) -> Result<Uuid, sqlx::Error> {
            self.placeholders.lock().unwrap().push(draft.clone());
            Ok(Uuid::new_v4())
        }

        async fn commit_ready(
            &self,
            _plan_id: Uuid,
            _user_id: Uuid,
            days: &[GeneratedDay],
            _limit: i32,
            _now: OffsetDateTime,
        ) -> Result<bool, sqlx::Error> {
            let mut left = self.quota_left.lock().unwrap();
            if *left <= 0 {
                return Ok(false);
            }
            *left -= 1;
            self.committed.lock().unwrap().extend_from_slice(days);
            Ok(true)
        }

        async fn mark_failed(&self, plan_id: Uuid) -> Result<(), sqlx::Error> {
            self.failed.lock().unwrap().push(plan_id);
            Ok(())
        }
    }

    struct FakeClient {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn ok(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self { reply: Err(()), prompts: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for FakeClient {
        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|_| GenerationError::EmptyResponse)
        }
    }

    const ONE_DAY: &str = r#"{"days":[{"day_index":0,"meals":{
        "meal_1":{"name":"Oats","description":"d","ingredients":["oats"],"steps":["cook"],
                  "prep_time_min":5,"servings":2,
                  "shopping_items":[{"name":"Oats","qty":"200 g","category":"pantry"}]},
        "meal_2":null,
        "meal_9":{"name":"Extra","description":"d","ingredients":[],"steps":[],
                  "prep_time_min":1,"servings":1}
    }}]}"#;

    fn ctx(tier: Tier, count: i32) -> PlanContext {
        PlanContext {
            user_id: Uuid::new_v4(),
            household_id: Uuid::new_v4(),
            tier,
            usage: UsageWindow { count, reset_at: NOW - time::Duration::hours(1) },
            measurement: MeasurementSystem::Metric,
            members: vec![test_member("Ana", Diet::Vegan)],
            pantry: vec!["rice".into()],
        }
    }

    fn draft(num_days: i32, use_it_up: bool) -> PlanDraft {
        PlanDraft { start_date: date!(2026 - 10 - 20), num_days, slots: default_slots(), use_it_up }
    }

    #[tokio::test]
    async fn success_commits_normalized_days() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::ok(ONE_DAY);
        let id = generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Free, 0), draft(1, false), NOW)
            .await
            .unwrap();

        assert!(!id.is_nil());
        let committed = store.committed.lock().unwrap();
        assert_eq!(committed.len(), 1);
        let keys: Vec<&str> = committed[0].meals.keys().map(String::as_str).collect();
        assert_eq!(keys, ["meal_1", "meal_2", "meal_3", "meal_4"]);
        assert!(committed[0].meals["meal_1"].is_some());
        assert!(store.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_completion_marks_plan_failed() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::failing();
        let err = generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Free, 0), draft(1, false), NOW)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "GENERATION_FAILED");
        assert_eq!(store.failed.lock().unwrap().len(), 1);
        assert!(store.committed.lock().unwrap().is_empty());
        assert_eq!(*store.quota_left.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn schema_mismatch_marks_plan_failed() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::ok(r#"{"days":[{"day_index":0,"meals":{"meal_1":{"name":"x"}}}]}"#);
        let err = generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Free, 0), draft(1, false), NOW)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "GENERATION_FAILED");
        assert_eq!(store.failed.lock().unwrap().len(), 1);
        assert!(store.committed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_day_marks_plan_failed() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::ok(r#"{"days":[{"day_index":0,"meals":{}},{"day_index":0,"meals":{}}]}"#);
        let err = generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Free, 0), draft(2, false), NOW)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "GENERATION_FAILED");
        assert_eq!(store.failed.lock().unwrap().len(), 1);
        assert!(store.committed.lock().unwrap().is_empty());
        assert_eq!(*store.quota_left.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn exhausted_quota_rejects_before_any_work() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::ok(ONE_DAY);
        let err = generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Free, 1), draft(1, false), NOW)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "QUOTA_EXCEEDED");
        assert_eq!(err.to_string(), "Daily generation limit reached (1). Upgrade to Pro for more.");
        assert_eq!(client.calls(), 0);
        assert!(store.placeholders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_window_allows_generation() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::ok(ONE_DAY);
        let mut c = ctx(Tier::Free, 5);
        c.usage.reset_at = NOW - time::Duration::hours(24);
        assert!(generate_plan(&store, &client, &PlanLimits::default(), c, draft(1, false), NOW)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn concurrent_spend_at_commit_fails_the_plan() {
        let store = FakeStore::with_quota(0);
        let client = FakeClient::ok(ONE_DAY);
        let err = generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Pro, 0), draft(1, false), NOW)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "QUOTA_EXCEEDED");
        assert_eq!(err.to_string(), "Daily generation limit reached (3). Try again tomorrow.");
        assert_eq!(store.failed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn too_many_days_is_forbidden() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::ok(ONE_DAY);
        let err = generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Free, 0), draft(4, false), NOW)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
        assert_eq!(err.to_string(), "Max 3 days for FREE tier.");
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn admission_checks_quota_then_length() {
        let limits = PlanLimits::default();
        let fresh = UsageWindow { count: 0, reset_at: NOW - time::Duration::hours(1) };
        let spent = UsageWindow { count: 1, reset_at: NOW - time::Duration::hours(1) };

        assert!(admit(&limits, Tier::Free, &fresh, 3, NOW).is_ok());
        assert_eq!(admit(&limits, Tier::Free, &fresh, 4, NOW).unwrap_err().code(), "FORBIDDEN");
        assert_eq!(admit(&limits, Tier::Free, &spent, 4, NOW).unwrap_err().code(), "QUOTA_EXCEEDED");
        assert!(admit(&limits, Tier::Pro, &spent, 30, NOW).is_ok());
    }

    #[tokio::test]
    async fn empty_household_is_rejected() {
        let store = FakeStore::with_quota(1);
        let client = FakeClient::ok(ONE_DAY);
        let mut c = ctx(Tier::Free, 0);
        c.members.clear();
        let err = generate_plan(&store, &client, &PlanLimits::default(), c, draft(1, false), NOW)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(store.placeholders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn use_it_up_only_applies_to_pro() {
        let store = FakeStore::with_quota(2);
        let client = FakeClient::ok(ONE_DAY);
        generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Free, 0), draft(1, true), NOW)
            .await
            .unwrap();
        generate_plan(&store, &client, &PlanLimits::default(), ctx(Tier::Pro, 0), draft(1, true), NOW)
            .await
            .unwrap();

        let drafts = store.placeholders.lock().unwrap();
        assert!(!drafts[0].use_it_up);
        assert!(drafts[1].use_it_up);

        let prompts = client.prompts.lock().unwrap();
        assert!(!prompts[0].contains("rice"));
        assert!(prompts[1].contains("rice"));
    }

    #[test]
    fn email_has_subject_heading_and_link() {
        let plan_id = Uuid::new_v4();
        let plan = Plan {
            id: plan_id,
            household_id: Uuid::new_v4(),
            start_date: date!(2026 - 10 - 20),
            num_days: 3,
            meals_enabled: Json(default_slots()),
            use_it_up: false,
            status: PlanStatus::Ready,
            created_at: NOW,
        };
        let parsed = parse_plan(ONE_DAY).unwrap();
        let days: Vec<DayMeals> = parsed.days.into_iter().map(|d| d.meals).collect();
        let list = aggregate_shopping_list(&days);

        let email = shopping_email(&plan, &list, "https://plan.example/");
        assert_eq!(email.subject, "Shopping list (3-day plan)");
        assert!(email.body.starts_with("Your shopping list for a 3-day plan\n\nPantry\n- Oats: 200 g\n\n"));
        assert!(email
            .body
            .ends_with(&format!("Open in the app: https://plan.example/dashboard/plans/{plan_id}/shopping")));
    }
}
