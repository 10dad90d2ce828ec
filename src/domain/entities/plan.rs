use serde::{Deserialize, Serialize};

use super::billing_period::BillingPeriod;

/// Name of the sentinel plan used when a price id is not in the catalog.
pub const UNKNOWN_PLAN_NAME: &str = "unknown";

/// Internal plan a provider price maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub billing_period: BillingPeriod,
}

impl Plan {
    pub fn new(name: impl Into<String>, billing_period: BillingPeriod) -> Self {
        Self {
            name: name.into(),
            billing_period,
        }
    }

    /// Sentinel returned for unmapped price ids.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_PLAN_NAME, BillingPeriod::Monthly)
    }

    /// Same plan, granted as a one-time lifetime purchase.
    pub fn as_lifetime(&self) -> Self {
        Self::new(self.name.clone(), BillingPeriod::Lifetime)
    }
}
