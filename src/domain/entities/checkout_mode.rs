use serde::{Deserialize, Serialize};

/// Checkout flavour: a recurring subscription or a one-time payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum CheckoutMode {
    #[default]
    Subscription,
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, CheckoutMode::Subscription)
    }
}

impl std::fmt::Display for CheckoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CheckoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "subscription" => Ok(CheckoutMode::Subscription),
            "payment" => Ok(CheckoutMode::Payment),
            _ => Err(format!(
                "Invalid checkout mode: {}. Must be 'subscription' or 'payment'",
                s
            )),
        }
    }
}
