use serde::{Deserialize, Serialize};

/// Local projection of a user's billing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    NotStarted,
    Active,
    Canceling,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::NotStarted => "not_started",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceling => "canceling",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Map a provider subscription status onto the local status set.
    ///
    /// A subscription scheduled to end at period end still grants access, but is
    /// tracked as `canceling` so the UI can show the pending cancellation.
    pub fn from_provider(status: &str, cancel_at_period_end: bool) -> Self {
        match status {
            "active" | "trialing" if cancel_at_period_end => SubscriptionStatus::Canceling,
            "active" | "trialing" => SubscriptionStatus::Active,
            "past_due" | "unpaid" => SubscriptionStatus::PastDue,
            "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
            // incomplete, paused and anything new: never grant access by default
            _ => SubscriptionStatus::NotStarted,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider_active_variants() {
        assert_eq!(
            SubscriptionStatus::from_provider("active", false),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("trialing", false),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("active", true),
            SubscriptionStatus::Canceling
        );
    }

    #[test]
    fn test_from_provider_terminal_and_failing() {
        assert_eq!(
            SubscriptionStatus::from_provider("past_due", false),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_provider("unpaid", false),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_provider("canceled", true),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired", false),
            SubscriptionStatus::Canceled
        );
    }

    #[test]
    fn test_from_provider_unknown_is_not_started() {
        for status in ["incomplete", "paused", "something_new", ""] {
            assert_eq!(
                SubscriptionStatus::from_provider(status, false),
                SubscriptionStatus::NotStarted
            );
        }
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
        let parsed: SubscriptionStatus = serde_json::from_str("\"past_due\"").unwrap();
        assert_eq!(parsed, SubscriptionStatus::PastDue);
    }
}
