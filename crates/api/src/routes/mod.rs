//! HTTP handlers grouped by audience.

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod settings;
