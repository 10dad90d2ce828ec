//! Mapping from provider price ids to internal plans.
//!
//! One catalog instance is built at startup and shared by the checkout and
//! webhook paths, so both agree on what a price id means.

use std::collections::HashMap;

use crate::domain::entities::{billing_period::BillingPeriod, plan::Plan};

/// Prices known to every deployment. Extra entries come from `PLAN_CATALOG`.
const BUILTIN_PLANS: &[(&str, &str, BillingPeriod)] = &[(
    "price_1SNKxAFUTMN3g7t4IS59w1Gc",
    "odbornik",
    BillingPeriod::Monthly,
)];

#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    entries: HashMap<String, Plan>,
}

impl PlanCatalog {
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for (price_id, name, period) in BUILTIN_PLANS {
            catalog.insert(*price_id, Plan::new(*name, *period));
        }
        catalog
    }

    /// Built-in table plus the entries from a `price_id=name:period;...` string.
    pub fn with_overrides(raw: &str) -> Self {
        let mut catalog = Self::builtin();
        catalog.extend_from_str(raw);
        catalog
    }

    pub fn insert(&mut self, price_id: impl Into<String>, plan: Plan) {
        self.entries.insert(price_id.into(), plan);
    }

    /// Adds entries parsed from `raw`. Malformed entries are skipped with a
    /// warning. Returns how many entries were added.
    pub fn extend_from_str(&mut self, raw: &str) -> usize {
        let mut added = 0;
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            match parse_entry(entry) {
                Ok((price_id, plan)) => {
                    self.insert(price_id, plan);
                    added += 1;
                }
                Err(reason) => {
                    tracing::warn!(entry = %entry, reason = %reason, "Skipping plan catalog entry");
                }
            }
        }
        added
    }

    /// Total: unmapped ids resolve to the `unknown` sentinel plan.
    pub fn resolve(&self, price_id: &str) -> Plan {
        match self.entries.get(price_id) {
            Some(plan) => plan.clone(),
            None => {
                tracing::warn!(price_id = %price_id, "Price id not in plan catalog");
                Plan::unknown()
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

fn parse_entry(entry: &str) -> Result<(String, Plan), String> {
    let (price_id, plan) = entry
        .split_once('=')
        .ok_or_else(|| "expected price_id=name:period".to_string())?;
    let (name, period) = plan
        .split_once(':')
        .ok_or_else(|| "expected name:period after '='".to_string())?;

    let price_id = price_id.trim();
    let name = name.trim();
    if price_id.is_empty() || name.is_empty() {
        return Err("price id and plan name must not be empty".into());
    }

    let period: BillingPeriod = period.parse()?;
    Ok((price_id.to_string(), Plan::new(name, period)))
}
