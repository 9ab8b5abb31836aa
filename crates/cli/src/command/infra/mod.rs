mod health;

pub use health::{HealthPort, HealthReport, Readiness, SourceHealth};
