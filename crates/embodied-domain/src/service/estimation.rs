//! Embodied carbon estimation
//!
//! # Formula
//! For every material in the (function, structure) palette:
//!
//! ```text
//! total_stock     = chosen_intensity × area              (kg)
//! embodied_carbon = total_stock × effective_factor       (kg CO2e)
//! ```
//!
//! `chosen_intensity` is the selection if present, else the record's p50.
//! `effective_factor` is the override if present, else the table factor
//! (0 when unmapped). The computation is pure and total: unknown pairs give
//! an empty breakdown, zero area gives zero carbon, negative area propagates.

use serde::Serialize;

use crate::model::{
    CarbonFactorTable, FactorOverrides, IntensityRecord, MaterialIntensityTable,
    MaterialSelections, Percentile,
};

/// Project inputs that drive a breakdown
#[derive(Debug, Clone, Copy)]
pub struct EstimateInput<'a> {
    pub function: &'a str,
    pub structure: &'a str,
    pub area_m2: f64,
    pub selections: &'a MaterialSelections,
    pub overrides: &'a FactorOverrides,
}

/// One material row of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialBreakdown {
    pub material: String,
    pub intensity: IntensityRecord,
    /// Chosen intensity (kg/m²)
    pub chosen_intensity: f64,
    /// Band whose value equals the chosen intensity, if any
    pub percentile: Option<Percentile>,
    pub total_stock_kg: f64,
    /// Factor from the reference table (0 when unmapped)
    pub default_factor: f64,
    pub effective_factor: f64,
    pub factor_overridden: bool,
    pub embodied_carbon_kg: f64,
}

/// Per-material rows plus their total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonBreakdown {
    pub function: String,
    pub structure: String,
    pub area_m2: f64,
    pub rows: Vec<MaterialBreakdown>,
    pub total_carbon_kg: f64,
}

impl CarbonBreakdown {
    pub fn total_carbon_tonnes(&self) -> f64 {
        self.total_carbon_kg / 1000.0
    }

    pub fn total_stock_kg(&self) -> f64 {
        self.rows.iter().map(|r| r.total_stock_kg).sum()
    }

    pub fn row(&self, material: &str) -> Option<&MaterialBreakdown> {
        self.rows.iter().find(|r| r.material == material)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn compute_breakdown(
    input: &EstimateInput<'_>,
    intensity: &MaterialIntensityTable,
    factors: &CarbonFactorTable,
) -> CarbonBreakdown {
    let palette = intensity.lookup(input.function, input.structure);

    let rows: Vec<MaterialBreakdown> = palette
        .iter()
        .map(|(material, record)| {
            let chosen_intensity = input
                .selections
                .get(material)
                .copied()
                .unwrap_or(record.p50);
            let total_stock_kg = chosen_intensity * input.area_m2;

            let default_factor = factors.factor_or_zero(material);
            let override_factor = input.overrides.get(material).copied();
            let effective_factor = override_factor.unwrap_or(default_factor);

            MaterialBreakdown {
                material: material.clone(),
                intensity: *record,
                chosen_intensity,
                percentile: matching_percentile(record, chosen_intensity),
                total_stock_kg,
                default_factor,
                effective_factor,
                factor_overridden: override_factor.is_some(),
                embodied_carbon_kg: total_stock_kg * effective_factor,
            }
        })
        .collect();

    let total_carbon_kg = rows.iter().map(|r| r.embodied_carbon_kg).sum();

    CarbonBreakdown {
        function: input.function.to_string(),
        structure: input.structure.to_string(),
        area_m2: input.area_m2,
        rows,
        total_carbon_kg,
    }
}

fn matching_percentile(record: &IntensityRecord, value: f64) -> Option<Percentile> {
    Percentile::ALL
        .iter()
        .copied()
        .find(|p| record.value(*p) == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FactorRow, IntensityRow};

    const EPS: f64 = 1e-9;
    const FUNC: &str = "residential multi-family";
    const STRUCT: &str = "reinforced concrete structure";

    fn tables() -> (MaterialIntensityTable, CarbonFactorTable) {
        let (intensity, _) = MaterialIntensityTable::build(vec![
            IntensityRow::new(FUNC, STRUCT, "concrete", [10.0, 20.0, 30.0, 40.0, 50.0].map(Some)),
            IntensityRow::new(FUNC, STRUCT, "steel", [2.0, 4.0, 6.0, 8.0, 10.0].map(Some)),
            IntensityRow::new(FUNC, STRUCT, "unobtainium", [1.0, 1.0, 1.0, 1.0, 1.0].map(Some)),
        ]);
        let (factors, _) = CarbonFactorTable::build(vec![
            FactorRow::new("Concrete", "0.1 \u{2013} 0.2"),
            FactorRow::new("Steel", "2.0"),
        ]);
        (intensity, factors)
    }

    fn input<'a>(
        area_m2: f64,
        selections: &'a MaterialSelections,
        overrides: &'a FactorOverrides,
    ) -> EstimateInput<'a> {
        EstimateInput {
            function: FUNC,
            structure: STRUCT,
            area_m2,
            selections,
            overrides,
        }
    }

    #[test]
    fn test_default_percentile_fill() {
        let (intensity, factors) = tables();
        let empty = MaterialSelections::new();
        let none = FactorOverrides::new();
        let breakdown = compute_breakdown(&input(1.0, &empty, &none), &intensity, &factors);
        let concrete = breakdown.row("concrete").unwrap();
        assert_eq!(concrete.chosen_intensity, 30.0);
        assert_eq!(concrete.percentile, Some(Percentile::P50));
    }

    #[test]
    fn test_basic_breakdown() {
        let (intensity, factors) = tables();
        let empty = MaterialSelections::new();
        let none = FactorOverrides::new();
        let breakdown = compute_breakdown(&input(100.0, &empty, &none), &intensity, &factors);

        assert_eq!(breakdown.rows.len(), 3);
        // concrete: 30 * 100 * 0.15 = 450
        let concrete = breakdown.row("concrete").unwrap();
        assert!((concrete.total_stock_kg - 3000.0).abs() < EPS);
        assert!((concrete.embodied_carbon_kg - 450.0).abs() < EPS);
        // steel: 6 * 100 * 2.0 = 1200
        assert!((breakdown.row("steel").unwrap().embodied_carbon_kg - 1200.0).abs() < EPS);
        // unmapped material contributes stock but no carbon
        let unknown = breakdown.row("unobtainium").unwrap();
        assert_eq!(unknown.default_factor, 0.0);
        assert_eq!(unknown.embodied_carbon_kg, 0.0);
        assert!((unknown.total_stock_kg - 100.0).abs() < EPS);

        assert!((breakdown.total_carbon_kg - 1650.0).abs() < EPS);
        assert!((breakdown.total_carbon_tonnes() - 1.65).abs() < EPS);
    }

    #[test]
    fn test_selection_is_used() {
        let (intensity, factors) = tables();
        let mut selections = MaterialSelections::new();
        selections.insert("concrete".to_string(), 40.0);
        let none = FactorOverrides::new();
        let breakdown = compute_breakdown(&input(10.0, &selections, &none), &intensity, &factors);
        let concrete = breakdown.row("concrete").unwrap();
        assert_eq!(concrete.chosen_intensity, 40.0);
        assert_eq!(concrete.percentile, Some(Percentile::P75));
        assert!((concrete.total_stock_kg - 400.0).abs() < EPS);
    }

    #[test]
    fn test_override_precedence() {
        let (intensity, factors) = tables();
        let empty = MaterialSelections::new();
        let mut overrides = FactorOverrides::new();
        overrides.insert("steel".to_string(), 0.5);
        let breakdown = compute_breakdown(&input(10.0, &empty, &overrides), &intensity, &factors);

        let steel = breakdown.row("steel").unwrap();
        assert!(steel.factor_overridden);
        assert_eq!(steel.default_factor, 2.0);
        assert_eq!(steel.effective_factor, 0.5);
        assert_eq!(steel.embodied_carbon_kg, steel.total_stock_kg * 0.5);
    }

    #[test]
    fn test_zero_override_is_respected() {
        let (intensity, factors) = tables();
        let empty = MaterialSelections::new();
        let mut overrides = FactorOverrides::new();
        overrides.insert("concrete".to_string(), 0.0);
        let breakdown = compute_breakdown(&input(10.0, &empty, &overrides), &intensity, &factors);
        assert_eq!(breakdown.row("concrete").unwrap().embodied_carbon_kg, 0.0);
    }

    #[test]
    fn test_zero_area() {
        let (intensity, factors) = tables();
        let mut selections = MaterialSelections::new();
        selections.insert("steel".to_string(), 10.0);
        let mut overrides = FactorOverrides::new();
        overrides.insert("concrete".to_string(), 3.0);
        let breakdown =
            compute_breakdown(&input(0.0, &selections, &overrides), &intensity, &factors);

        assert_eq!(breakdown.total_carbon_kg, 0.0);
        for row in &breakdown.rows {
            assert_eq!(row.total_stock_kg, 0.0);
            assert_eq!(row.embodied_carbon_kg, 0.0);
        }
    }

    #[test]
    fn test_negative_area_propagates() {
        let (intensity, factors) = tables();
        let empty = MaterialSelections::new();
        let none = FactorOverrides::new();
        let breakdown = compute_breakdown(&input(-100.0, &empty, &none), &intensity, &factors);
        assert!((breakdown.total_carbon_kg + 1650.0).abs() < EPS);
    }

    #[test]
    fn test_unknown_pair_is_empty() {
        let (intensity, factors) = tables();
        let empty = MaterialSelections::new();
        let none = FactorOverrides::new();
        let input = EstimateInput {
            function: "office",
            structure: "timber frame",
            area_m2: 500.0,
            selections: &empty,
            overrides: &none,
        };
        let breakdown = compute_breakdown(&input, &intensity, &factors);
        assert!(breakdown.is_empty());
        assert_eq!(breakdown.total_carbon_kg, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let (intensity, factors) = tables();
        let mut selections = MaterialSelections::new();
        selections.insert("concrete".to_string(), 20.0);
        let mut overrides = FactorOverrides::new();
        overrides.insert("steel".to_string(), 1.7);
        let input = input(1234.5, &selections, &overrides);

        let first = compute_breakdown(&input, &intensity, &factors);
        let second = compute_breakdown(&input, &intensity, &factors);
        assert_eq!(first, second);
        assert_eq!(first.total_carbon_kg.to_bits(), second.total_carbon_kg.to_bits());
    }

    #[test]
    fn test_custom_intensity_has_no_band() {
        let (intensity, factors) = tables();
        let mut selections = MaterialSelections::new();
        selections.insert("concrete".to_string(), 33.3);
        let none = FactorOverrides::new();
        let breakdown = compute_breakdown(&input(1.0, &selections, &none), &intensity, &factors);
        assert_eq!(breakdown.row("concrete").unwrap().percentile, None);
    }
}
