//! Data-quality warnings raised while building the reference tables

use serde::Serialize;

/// A non-fatal problem found in the reference data.
///
/// Table builders never abort on these; the offending value is defaulted or
/// the row is skipped, and the warning is kept so callers can report it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    /// A percentile column was empty or non-numeric; stored as 0
    MissingPercentile {
        function: String,
        structure: String,
        material: String,
        percentile: &'static str,
    },
    /// p0 <= p25 <= p50 <= p75 <= p100 does not hold
    NonMonotonicPercentiles {
        function: String,
        structure: String,
        material: String,
    },
    /// Row lacks a function, structure or material name and was skipped
    MissingKey { row: usize },
    /// Factor expression could not be parsed; stored as 0
    UnparsableFactor { material: String, expression: String },
    /// Factor expression parsed to a negative number; stored as 0
    NegativeFactor { material: String, value: f64 },
    /// Alias target already has its own row, which is kept
    AliasShadowed { source: String, alias: String },
    /// Alias source key is absent, so the alias was not created
    AliasSourceMissing { source: String, alias: String },
}

impl std::fmt::Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataWarning::MissingPercentile {
                function,
                structure,
                material,
                percentile,
            } => write!(
                f,
                "missing {} for {} / {} / {}, using 0",
                percentile, function, structure, material
            ),
            DataWarning::NonMonotonicPercentiles {
                function,
                structure,
                material,
            } => write!(
                f,
                "percentiles not ascending for {} / {} / {}",
                function, structure, material
            ),
            DataWarning::MissingKey { row } => {
                write!(f, "row {} has no function, structure or material; skipped", row)
            }
            DataWarning::UnparsableFactor {
                material,
                expression,
            } => write!(
                f,
                "unparsable carbon factor {:?} for {}, using 0",
                expression, material
            ),
            DataWarning::NegativeFactor { material, value } => {
                write!(f, "negative carbon factor {} for {}, using 0", value, material)
            }
            DataWarning::AliasShadowed { source, alias } => write!(
                f,
                "alias {:?} -> {:?} ignored, {:?} has its own entry",
                source, alias, alias
            ),
            DataWarning::AliasSourceMissing { source, alias } => write!(
                f,
                "alias {:?} -> {:?} skipped, source not in table",
                source, alias
            ),
        }
    }
}
