//! Reference data bootstrap
//!
//! Both tables are loaded once at startup and only read afterwards.

use std::path::Path;

use tracing::info;

use embodied_domain::model::{
    CarbonFactorTable, DataWarning, FactorRow, IntensityRow, MaterialIntensityTable, ProjectDraft,
};
use embodied_domain::service::CarbonBreakdown;
use embodied_infra::{load_factor_rows, load_intensity_rows};
use embodied_types::{Error, Result};

use crate::config::Config;

/// The two read-only reference tables plus the warnings raised building them
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub intensity: MaterialIntensityTable,
    pub factors: CarbonFactorTable,
    pub warnings: Vec<DataWarning>,
}

impl ReferenceData {
    /// Load the tables named in the config
    pub fn load(config: &Config) -> Result<Self> {
        Self::load_from_paths(&config.intensity_csv, &config.carbon_factor_csv)
    }

    pub fn load_from_paths(intensity_csv: &Path, factor_csv: &Path) -> Result<Self> {
        for path in [intensity_csv, factor_csv] {
            if !path.exists() {
                return Err(Error::FileNotFound(format!(
                    "Reference table not found: {}",
                    path.display()
                )));
            }
        }

        let intensity_rows = load_intensity_rows(intensity_csv)?;
        let factor_rows = load_factor_rows(factor_csv)?;
        let data = Self::from_rows(intensity_rows, factor_rows);

        info!(
            "loaded {} intensity entries from {}, {} carbon factors from {} ({} warnings)",
            data.intensity.len(),
            intensity_csv.display(),
            data.factors.len(),
            factor_csv.display(),
            data.warnings.len()
        );
        Ok(data)
    }

    pub fn from_rows(intensity_rows: Vec<IntensityRow>, factor_rows: Vec<FactorRow>) -> Self {
        let (intensity, mut warnings) = MaterialIntensityTable::build(intensity_rows);
        let (factors, factor_warnings) = CarbonFactorTable::build(factor_rows);
        warnings.extend(factor_warnings);

        Self {
            intensity,
            factors,
            warnings,
        }
    }

    /// Live breakdown for a draft
    pub fn breakdown(&self, draft: &ProjectDraft) -> CarbonBreakdown {
        draft.breakdown(&self.intensity, &self.factors)
    }
}
