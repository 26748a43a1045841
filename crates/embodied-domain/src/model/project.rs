//! Project records and the editable draft that produces them

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::carbon_factor::CarbonFactorTable;
use super::intensity::{MaterialIntensityTable, Percentile};
use crate::service::estimation::{compute_breakdown, CarbonBreakdown, EstimateInput};

pub type ProjectId = i64;

/// Chosen intensity (kg/m²) per material
pub type MaterialSelections = BTreeMap<String, f64>;

/// User-supplied carbon factor (kg CO2e/kg) per material
pub type FactorOverrides = BTreeMap<String, f64>;

pub const DEFAULT_AREA_M2: f64 = 1000.0;
pub const DEFAULT_FUNCTION: &str = "residential multi-family";
pub const DEFAULT_STRUCTURE: &str = "reinforced concrete structure";
pub const DEFAULT_LOCATION: &str = "Jakarta, Indonesia";
pub const DEFAULT_LAT: f64 = -6.2088;
pub const DEFAULT_LNG: f64 = 106.8456;

/// Persisted snapshot of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub building_id: String,
    /// Floor area (m²)
    pub area: f64,
    /// Building function
    #[serde(rename = "type")]
    pub function: String,
    pub structural_type: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Total embodied carbon at save time (kg CO2e)
    pub calculated_carbon: f64,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub material_selections: MaterialSelections,
    #[serde(default)]
    pub custom_carbon_factors: FactorOverrides,
}

/// ISO-8601 in UTC with millisecond digits (`2024-05-01T09:30:00.000Z`);
/// finer digits only when the value carries them
mod timestamp_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let format = if timestamp.timestamp_subsec_nanos() % 1_000_000 == 0 {
            SecondsFormat::Millis
        } else {
            SecondsFormat::AutoSi
        };
        serializer.serialize_str(&timestamp.to_rfc3339_opts(format, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

impl ProjectRecord {
    pub fn calculated_carbon_tonnes(&self) -> f64 {
        self.calculated_carbon / 1000.0
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lng)
    }

    /// Case-insensitive match on building id or function
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.building_id.to_lowercase().contains(&term)
            || self.function.to_lowercase().contains(&term)
    }
}

/// Where a draft came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// Not yet saved
    Draft,
    /// Loaded back from a persisted record
    Edited(ProjectId),
}

/// In-memory form state for creating or editing a project.
///
/// Changing the function or structure clears the material selections, so
/// the next breakdown falls back to p50 for the new palette. Overrides are
/// kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    state: DraftState,
    building_id: String,
    area_m2: f64,
    function: String,
    structure: String,
    location: String,
    lat: Option<f64>,
    lng: Option<f64>,
    selections: MaterialSelections,
    overrides: FactorOverrides,
}

impl Default for ProjectDraft {
    fn default() -> Self {
        Self {
            state: DraftState::Draft,
            building_id: String::new(),
            area_m2: DEFAULT_AREA_M2,
            function: DEFAULT_FUNCTION.to_string(),
            structure: DEFAULT_STRUCTURE.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            lat: Some(DEFAULT_LAT),
            lng: Some(DEFAULT_LNG),
            selections: MaterialSelections::new(),
            overrides: FactorOverrides::new(),
        }
    }
}

impl ProjectDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fill a draft from a stored snapshot
    pub fn from_record(record: &ProjectRecord) -> Self {
        Self {
            state: DraftState::Edited(record.id),
            building_id: record.building_id.clone(),
            area_m2: record.area,
            function: record.function.clone(),
            structure: record.structural_type.clone(),
            location: record.location.clone(),
            lat: record.lat,
            lng: record.lng,
            selections: record.material_selections.clone(),
            overrides: record.custom_carbon_factors.clone(),
        }
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn id(&self) -> Option<ProjectId> {
        match self.state {
            DraftState::Draft => None,
            DraftState::Edited(id) => Some(id),
        }
    }

    pub fn building_id(&self) -> &str {
        &self.building_id
    }

    pub fn area_m2(&self) -> f64 {
        self.area_m2
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn structure(&self) -> &str {
        &self.structure
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        (self.lat, self.lng)
    }

    pub fn selections(&self) -> &MaterialSelections {
        &self.selections
    }

    pub fn overrides(&self) -> &FactorOverrides {
        &self.overrides
    }

    pub fn set_building_id(&mut self, building_id: impl Into<String>) {
        self.building_id = building_id.into();
    }

    /// Negative areas are accepted as-is
    pub fn set_area(&mut self, area_m2: f64) {
        self.area_m2 = area_m2;
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    pub fn set_coordinates(&mut self, lat: Option<f64>, lng: Option<f64>) {
        self.lat = lat;
        self.lng = lng;
    }

    /// Returns true when the change cleared the material selections
    pub fn set_function(&mut self, function: impl Into<String>) -> bool {
        let function = function.into();
        if function == self.function {
            return false;
        }
        self.function = function;
        self.reset_selections()
    }

    /// Returns true when the change cleared the material selections
    pub fn set_structure(&mut self, structure: impl Into<String>) -> bool {
        let structure = structure.into();
        if structure == self.structure {
            return false;
        }
        self.structure = structure;
        self.reset_selections()
    }

    fn reset_selections(&mut self) -> bool {
        debug!(
            "palette changed to {} / {}, clearing {} selections",
            self.function,
            self.structure,
            self.selections.len()
        );
        self.selections.clear();
        true
    }

    /// Copy the given percentile value into the selections.
    ///
    /// Returns the chosen value, or `None` when the material is not part of
    /// the current palette.
    pub fn select_percentile(
        &mut self,
        table: &MaterialIntensityTable,
        material: &str,
        percentile: Percentile,
    ) -> Option<f64> {
        let (key, record) = table.resolve_material(&self.function, &self.structure, material)?;
        let value = record.value(percentile);
        self.selections.insert(key.to_string(), value);
        Some(value)
    }

    /// Explicit intensity for a palette material.
    ///
    /// Returns the palette key it was stored under, or `None` (nothing
    /// stored) when the material is not part of the current palette.
    pub fn set_intensity(
        &mut self,
        table: &MaterialIntensityTable,
        material: &str,
        intensity: f64,
    ) -> Option<String> {
        let key = self.palette_key(table, material)?;
        self.selections.insert(key.clone(), intensity);
        Some(key)
    }

    /// Custom carbon factor for a palette material; same matching as
    /// [`set_intensity`](Self::set_intensity)
    pub fn set_factor_override(
        &mut self,
        table: &MaterialIntensityTable,
        material: &str,
        factor: f64,
    ) -> Option<String> {
        let key = self.palette_key(table, material)?;
        self.overrides.insert(key.clone(), factor);
        Some(key)
    }

    /// Case-insensitive; true when an override was removed
    pub fn clear_factor_override(&mut self, material: &str) -> bool {
        let wanted = material.trim().to_lowercase();
        let before = self.overrides.len();
        self.overrides.retain(|key, _| key.trim().to_lowercase() != wanted);
        self.overrides.len() != before
    }

    fn palette_key(&self, table: &MaterialIntensityTable, material: &str) -> Option<String> {
        table
            .resolve_material(&self.function, &self.structure, material)
            .map(|(key, _)| key.to_string())
    }

    pub fn estimate_input(&self) -> EstimateInput<'_> {
        EstimateInput {
            function: &self.function,
            structure: &self.structure,
            area_m2: self.area_m2,
            selections: &self.selections,
            overrides: &self.overrides,
        }
    }

    /// Live breakdown for the current form state
    pub fn breakdown(
        &self,
        intensity: &MaterialIntensityTable,
        factors: &CarbonFactorTable,
    ) -> CarbonBreakdown {
        compute_breakdown(&self.estimate_input(), intensity, factors)
    }

    /// Produce the snapshot to persist.
    ///
    /// An edited draft keeps its id; a new one takes `new_id()`. The stored
    /// selections are the intensities actually used, p50 defaults included.
    pub fn to_record<F>(
        &self,
        intensity: &MaterialIntensityTable,
        factors: &CarbonFactorTable,
        new_id: F,
        now: DateTime<Utc>,
    ) -> ProjectRecord
    where
        F: FnOnce() -> ProjectId,
    {
        let breakdown = self.breakdown(intensity, factors);
        let id = match self.state {
            DraftState::Edited(id) => id,
            DraftState::Draft => new_id(),
        };

        ProjectRecord {
            id,
            building_id: self.building_id.clone(),
            area: self.area_m2,
            function: self.function.clone(),
            structural_type: self.structure.clone(),
            location: self.location.clone(),
            lat: self.lat,
            lng: self.lng,
            calculated_carbon: breakdown.total_carbon_kg,
            timestamp: now,
            material_selections: breakdown
                .rows
                .iter()
                .map(|row| (row.material.clone(), row.chosen_intensity))
                .collect(),
            custom_carbon_factors: self.overrides.clone(),
        }
    }
}

/// Parse user-entered numbers; anything non-numeric or non-finite is 0
pub fn coerce_number(input: &str) -> f64 {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Timestamp-derived id that never collides with an existing one
pub fn allocate_project_id<I>(existing: I, now: DateTime<Utc>) -> ProjectId
where
    I: IntoIterator<Item = ProjectId>,
{
    let next_free = existing
        .into_iter()
        .max()
        .map(|max| max.saturating_add(1))
        .unwrap_or(ProjectId::MIN);
    now.timestamp_millis().max(next_free)
}
