// Domain layer - Fleet telemetry models
pub mod alert;
pub mod display;
pub mod fleet;
pub mod lenient;
pub mod telemetry;
pub mod time_range;
pub mod user;
