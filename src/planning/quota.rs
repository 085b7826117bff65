//! Rolling 24-hour usage windows.
//!
//! A window resets lazily: once 24 hours have passed since `reset_at`, the
//! stored count is stale and treated as zero. The database applies the same
//! rule inside a conditional UPDATE (see `account::repo::consume_usage`).

use time::{Duration, OffsetDateTime};

use crate::{account::repo_types::Tier, error::AppError};

pub const WINDOW: Duration = Duration::hours(24);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageCounter {
    Generations,
    ShoppingEmails,
}

impl UsageCounter {
    /// (count column, reset column) on `users`.
    pub(crate) fn columns(self) -> (&'static str, &'static str) {
        match self {
            UsageCounter::Generations => ("generations_today", "generations_reset_at"),
            UsageCounter::ShoppingEmails => ("shopping_emails_today", "shopping_emails_reset_at"),
        }
    }

    fn label(self) -> &'static str {
        match self {
            UsageCounter::Generations => "generation",
            UsageCounter::ShoppingEmails => "shopping-list email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub count: i32,
    pub reset_at: OffsetDateTime,
}

impl UsageWindow {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now - self.reset_at >= WINDOW
    }

    pub fn effective_count(&self, now: OffsetDateTime) -> i32 {
        if self.is_expired(now) {
            0
        } else {
            self.count
        }
    }

    pub fn has_room(&self, limit: i32, now: OffsetDateTime) -> bool {
        self.effective_count(now) < limit
    }

    /// The window after one more successful use.
    pub fn consume(&self, now: OffsetDateTime) -> UsageWindow {
        if self.is_expired(now) {
            UsageWindow { count: 1, reset_at: now }
        } else {
            UsageWindow { count: self.count + 1, reset_at: self.reset_at }
        }
    }

    pub fn check(
        &self,
        counter: UsageCounter,
        tier: Tier,
        limit: i32,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        if self.has_room(limit, now) {
            Ok(())
        } else {
            Err(quota_exceeded(counter, tier, limit))
        }
    }
}

pub fn quota_exceeded(counter: UsageCounter, tier: Tier, limit: i32) -> AppError {
    let hint = match tier {
        Tier::Free => "Upgrade to Pro for more.",
        Tier::Pro => "Try again tomorrow.",
    };
    AppError::QuotaExceeded {
        limit,
        message: format!("Daily {} limit reached ({limit}). {hint}", counter.label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-10-19 12:00 UTC);

    #[test]
    fn stale_window_counts_as_zero_and_restarts() {
        let w = UsageWindow { count: 3, reset_at: NOW - Duration::hours(25) };
        assert_eq!(w.effective_count(NOW), 0);
        assert!(w.check(UsageCounter::Generations, Tier::Pro, 3, NOW).is_ok());
        assert_eq!(w.consume(NOW), UsageWindow { count: 1, reset_at: NOW });
    }

    #[test]
    fn exactly_24_hours_is_expired() {
        let w = UsageWindow { count: 1, reset_at: NOW - Duration::hours(24) };
        assert!(w.is_expired(NOW));
        let w = UsageWindow { count: 1, reset_at: NOW - Duration::hours(24) + Duration::seconds(1) };
        assert!(!w.is_expired(NOW));
    }

    #[test]
    fn live_window_increments_and_blocks_at_limit() {
        let reset_at = NOW - Duration::hours(2);
        let w = UsageWindow { count: 0, reset_at };
        let w = w.consume(NOW);
        assert_eq!(w, UsageWindow { count: 1, reset_at });

        let err = w.check(UsageCounter::Generations, Tier::Free, 1, NOW).unwrap_err();
        match err {
            AppError::QuotaExceeded { limit, message } => {
                assert_eq!(limit, 1);
                assert_eq!(message, "Daily generation limit reached (1). Upgrade to Pro for more.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pro_hint_says_tomorrow() {
        let err = quota_exceeded(UsageCounter::ShoppingEmails, Tier::Pro, 3);
        assert!(err.to_string().ends_with("Try again tomorrow."));
        assert!(err.to_string().contains("shopping-list email"));
    }
}
