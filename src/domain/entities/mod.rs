pub mod billing_event;
pub mod billing_period;
pub mod checkout_mode;
pub mod plan;
pub mod subscription_status;
