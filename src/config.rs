use serde::Deserialize;

use crate::account::repo_types::Tier;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Ceilings that apply to one subscription tier.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct TierLimits {
    pub daily_generations: i32,
    pub max_plan_days: i32,
    pub max_members: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlanLimits {
    pub free: TierLimits,
    pub pro: TierLimits,
}

impl PlanLimits {
    pub fn for_tier(&self, tier: Tier) -> &TierLimits {
        match tier {
            Tier::Free => &self.free,
            Tier::Pro => &self.pro,
        }
    }
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            free: TierLimits {
                daily_generations: 1,
                max_plan_days: 3,
                max_members: 3,
            },
            pro: TierLimits {
                daily_generations: 3,
                max_plan_days: 30,
                max_members: 6,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub pro_price_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub app_url: String,
    pub jwt: JwtConfig,
    pub limits: PlanLimits,
    pub llm: LlmConfig,
    pub smtp: Option<SmtpConfig>,
    pub stripe: Option<StripeConfig>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mealplan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "mealplan-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let defaults = PlanLimits::default();
        let limits = PlanLimits {
            free: TierLimits {
                daily_generations: env_or("PLAN_DAILY_LIMIT_FREE", defaults.free.daily_generations),
                max_plan_days: env_or("PLAN_MAX_DAYS_FREE", defaults.free.max_plan_days),
                max_members: env_or("MEMBERS_MAX_FREE", defaults.free.max_members),
            },
            pro: TierLimits {
                daily_generations: env_or("PLAN_DAILY_LIMIT_PRO", defaults.pro.daily_generations),
                max_plan_days: env_or("PLAN_MAX_DAYS_PRO", defaults.pro.max_plan_days),
                max_members: env_or("MEMBERS_MAX_PRO", defaults.pro.max_members),
            },
        };

        let llm = LlmConfig {
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: env_opt("LLM_API_KEY"),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            max_tokens: env_or("LLM_MAX_TOKENS", 4096),
            timeout_secs: env_or("LLM_TIMEOUT_SECS", 120),
        };

        // SMTP is all-or-nothing: without a host and sender, email is unavailable.
        let smtp = match (env_opt("SMTP_HOST"), env_opt("SMTP_FROM")) {
            (Some(host), Some(from)) => Some(SmtpConfig {
                host,
                port: env_or("SMTP_PORT", 587),
                user: env_opt("SMTP_USER"),
                password: env_opt("SMTP_PASSWORD"),
                from,
            }),
            _ => None,
        };

        let stripe = env_opt("STRIPE_SECRET_KEY").map(|secret_key| StripeConfig {
            secret_key,
            webhook_secret: env_opt("STRIPE_WEBHOOK_SECRET"),
            pro_price_id: env_opt("STRIPE_PRO_PRICE_ID"),
        });

        Ok(Self {
            database_url,
            app_url: std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".into()),
            jwt,
            limits,
            llm,
            smtp,
            stripe,
        })
    }
}
