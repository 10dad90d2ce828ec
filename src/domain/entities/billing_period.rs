use serde::{Deserialize, Serialize};

/// How often a plan is billed. Lifetime plans are paid once and never renew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Yearly,
    Lifetime,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Yearly => "yearly",
            BillingPeriod::Lifetime => "lifetime",
        }
    }

    /// Lifetime grants have no provider subscription and no renewal period.
    pub fn is_lifetime(&self) -> bool {
        matches!(self, BillingPeriod::Lifetime)
    }

    /// Whether this period renews through a provider subscription.
    pub fn is_recurring(&self) -> bool {
        !self.is_lifetime()
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BillingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(BillingPeriod::Monthly),
            "yearly" | "year" | "annual" => Ok(BillingPeriod::Yearly),
            "lifetime" => Ok(BillingPeriod::Lifetime),
            _ => Err(format!(
                "Invalid billing period: {}. Must be 'monthly', 'yearly' or 'lifetime'",
                s
            )),
        }
    }
}
