pub mod app_error;
pub mod jwt;
pub mod plan_catalog;
pub mod ports;
pub mod use_cases;
