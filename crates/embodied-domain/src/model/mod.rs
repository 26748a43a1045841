//! Domain model types

pub mod carbon_factor;
pub mod intensity;
pub mod project;
pub mod warning;

pub use carbon_factor::{parse_factor_expression, CarbonFactorTable, FactorRow, FACTOR_ALIASES};
pub use intensity::{IntensityRecord, IntensityRow, MaterialIntensityTable, Percentile};
pub use project::{
    allocate_project_id, coerce_number, DraftState, FactorOverrides, MaterialSelections,
    ProjectDraft, ProjectId, ProjectRecord,
};
pub use warning::DataWarning;
