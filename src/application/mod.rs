// Application layer - Use cases and services
pub mod account_service;
pub mod aggregation;
pub mod classifier;
pub mod correlation;
pub mod dashboard_service;
pub mod fleet_backend;
pub mod listing;
pub mod refresh;
pub mod session;
pub mod views;
