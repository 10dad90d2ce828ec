pub mod cancellation;
pub mod checkout;
pub mod reconciliation;
pub mod subscription;
pub mod webhook_dispatch;
