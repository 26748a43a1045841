//! Application use cases

pub mod project_service;

pub use project_service::{DashboardSummary, Durability, MapMarker, ProjectService};
