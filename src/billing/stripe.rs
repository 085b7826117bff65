//! Minimal Stripe REST client: checkout sessions and subscription lookups.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::StripeConfig;

const STRIPE_API: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Stripe API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Stripe returned no checkout url")]
    MissingUrl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub cancel_at: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub current_period_end: i64,
}

impl Subscription {
    /// Scheduled cancel time if any, else the latest item period end.
    pub fn period_end(&self) -> i64 {
        self.cancel_at
            .filter(|t| *t > 0)
            .unwrap_or_else(|| self.items.data.iter().map(|i| i.current_period_end).max().unwrap_or(0))
    }

    fn is_live(&self) -> bool {
        !matches!(self.status.as_str(), "canceled" | "incomplete_expired")
    }
}

/// The live subscription that runs the longest.
pub fn select_subscription(subscriptions: Vec<Subscription>) -> Option<Subscription> {
    subscriptions
        .into_iter()
        .filter(Subscription::is_live)
        .fold(None, |best: Option<Subscription>, s| match best {
            Some(b) if b.period_end() >= s.period_end() => Some(b),
            _ => Some(s),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    pub has_active_subscription: bool,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<String>,
    pub subscription_id: Option<String>,
}

impl From<Option<&Subscription>> for SubscriptionView {
    fn from(subscription: Option<&Subscription>) -> Self {
        let Some(s) = subscription else {
            return Self {
                has_active_subscription: false,
                cancel_at_period_end: false,
                current_period_end: None,
                subscription_id: None,
            };
        };
        let current_period_end = Some(s.period_end())
            .filter(|t| *t > 0)
            .and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok())
            .and_then(|t| t.format(&Rfc3339).ok());
        Self {
            has_active_subscription: true,
            cancel_at_period_end: s.cancel_at_period_end,
            current_period_end,
            subscription_id: Some(s.id.clone()),
        }
    }
}

/// Who is buying: an existing customer, or a new one identified by email.
pub enum Buyer<'a> {
    Customer(&'a str),
    Email(&'a str),
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    #[serde(default)]
    data: Vec<Subscription>,
}

pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    pub pro_price_id: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            pro_price_id: config.pro_price_id.clone(),
        })
    }

    async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, BillingError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Api { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }

    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        user_id: Uuid,
        buyer: Buyer<'_>,
        app_url: &str,
    ) -> Result<String, BillingError> {
        let form = checkout_form(price_id, user_id, buyer, app_url);
        let response = self
            .client
            .post(format!("{STRIPE_API}/checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;
        let session: CheckoutSession = Self::read(response).await?;
        debug!(%user_id, "checkout session created");
        session.url.ok_or(BillingError::MissingUrl)
    }

    pub async fn list_subscriptions(&self, customer_id: &str) -> Result<Vec<Subscription>, BillingError> {
        let response = self
            .client
            .get(format!("{STRIPE_API}/subscriptions"))
            .bearer_auth(&self.secret_key)
            .query(&[("customer", customer_id), ("status", "all"), ("limit", "20")])
            .send()
            .await?;
        let list: SubscriptionList = Self::read(response).await?;
        Ok(list.data)
    }

    pub async fn schedule_cancel(&self, subscription_id: &str) -> Result<Subscription, BillingError> {
        let response = self
            .client
            .post(format!("{STRIPE_API}/subscriptions/{subscription_id}"))
            .bearer_auth(&self.secret_key)
            .form(&[("cancel_at_period_end", "true")])
            .send()
            .await?;
        Self::read(response).await
    }
}

fn checkout_form(price_id: &str, user_id: Uuid, buyer: Buyer<'_>, app_url: &str) -> Vec<(&'static str, String)> {
    let base = app_url.trim_end_matches('/');
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", price_id.to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", format!("{base}/dashboard/account?billing=success")),
        ("cancel_url", format!("{base}/dashboard/account?billing=cancel")),
        ("metadata[userId]", user_id.to_string()),
    ];
    match buyer {
        Buyer::Customer(id) => form.push(("customer", id.to_string())),
        Buyer::Email(email) => form.push(("customer_email", email.to_string())),
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sub(id: &str, status: &str, cancel_at: Option<i64>, ends: &[i64]) -> Subscription {
        serde_json::from_value(json!({
            "id": id,
            "status": status,
            "cancel_at_period_end": cancel_at.is_some(),
            "cancel_at": cancel_at,
            "items": { "data": ends.iter().map(|e| json!({ "current_period_end": e })).collect::<Vec<_>>() },
        }))
        .unwrap()
    }

    #[test]
    fn picks_latest_live_subscription() {
        let chosen = select_subscription(vec![
            sub("old", "active", None, &[1_000]),
            sub("gone", "canceled", None, &[9_000]),
            sub("expired", "incomplete_expired", None, &[9_500]),
            sub("new", "trialing", None, &[2_000, 5_000]),
            sub("ending", "active", Some(4_000), &[8_000]),
        ])
        .unwrap();
        assert_eq!(chosen.id, "new");
        assert_eq!(chosen.period_end(), 5_000);
    }

    #[test]
    fn cancel_at_wins_over_item_period() {
        let s = sub("s", "active", Some(4_000), &[8_000]);
        assert_eq!(s.period_end(), 4_000);
        assert!(select_subscription(vec![sub("x", "canceled", None, &[1])]).is_none());
    }

    #[test]
    fn view_formats_period_end() {
        let s = sub("sub_1", "active", Some(1_767_225_600), &[]);
        let view = SubscriptionView::from(Some(&s));
        assert!(view.has_active_subscription);
        assert!(view.cancel_at_period_end);
        assert_eq!(view.current_period_end.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(view.subscription_id.as_deref(), Some("sub_1"));

        let empty = SubscriptionView::from(None);
        assert!(!empty.has_active_subscription);
        assert!(empty.current_period_end.is_none());

        let no_end = SubscriptionView::from(Some(&sub("s", "active", None, &[])));
        assert!(no_end.current_period_end.is_none());
    }

    #[test]
    fn checkout_form_prefers_known_customer() {
        let user_id = Uuid::new_v4();
        let form = checkout_form("price_pro", user_id, Buyer::Customer("cus_1"), "https://app.example/");
        assert!(form.contains(&("customer", "cus_1".to_string())));
        assert!(!form.iter().any(|(k, _)| *k == "customer_email"));
        assert!(form.contains(&("metadata[userId]", user_id.to_string())));
        assert!(form.contains(&(
            "success_url",
            "https://app.example/dashboard/account?billing=success".to_string()
        )));

        let form = checkout_form("price_pro", user_id, Buyer::Email("a@b.co"), "https://app.example");
        assert!(form.contains(&("customer_email", "a@b.co".to_string())));
    }
}
