//! Domain services

pub mod estimation;

pub use estimation::{compute_breakdown, CarbonBreakdown, EstimateInput, MaterialBreakdown};
