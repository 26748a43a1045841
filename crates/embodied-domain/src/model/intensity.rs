//! Material intensity reference table
//!
//! Three-level lookup: building function -> structural system -> material,
//! each leaf holding the five percentile bands of observed kg/m².

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::warning::DataWarning;

/// Percentile band of the observed material intensity distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Percentile {
    P0,
    P25,
    #[default]
    P50,
    P75,
    P100,
}

impl Percentile {
    pub const ALL: [Percentile; 5] = [
        Percentile::P0,
        Percentile::P25,
        Percentile::P50,
        Percentile::P75,
        Percentile::P100,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Percentile::P0 => "P0",
            Percentile::P25 => "P25",
            Percentile::P50 => "P50",
            Percentile::P75 => "P75",
            Percentile::P100 => "P100",
        }
    }

    /// Column name in the intensity source table
    pub fn column(&self) -> &'static str {
        match self {
            Percentile::P0 => "p_0",
            Percentile::P25 => "p_25",
            Percentile::P50 => "p_50",
            Percentile::P75 => "p_75",
            Percentile::P100 => "p_100",
        }
    }

    fn index(&self) -> usize {
        match self {
            Percentile::P0 => 0,
            Percentile::P25 => 1,
            Percentile::P50 => 2,
            Percentile::P75 => 3,
            Percentile::P100 => 4,
        }
    }
}

impl std::fmt::Display for Percentile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Percentile {
    type Err = String;

    /// Accepts `p75`, `P75`, `p_75` or `75`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let digits = lowered.trim_start_matches('p').trim_start_matches('_');
        match digits {
            "0" => Ok(Percentile::P0),
            "25" => Ok(Percentile::P25),
            "50" => Ok(Percentile::P50),
            "75" => Ok(Percentile::P75),
            "100" => Ok(Percentile::P100),
            _ => Err(format!(
                "unknown percentile {:?} (expected p0, p25, p50, p75 or p100)",
                s
            )),
        }
    }
}

/// Five-percentile intensity record in kg/m²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensityRecord {
    pub p0: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p100: f64,
}

impl IntensityRecord {
    pub fn from_values(values: [f64; 5]) -> Self {
        Self {
            p0: values[0],
            p25: values[1],
            p50: values[2],
            p75: values[3],
            p100: values[4],
        }
    }

    pub fn values(&self) -> [f64; 5] {
        [self.p0, self.p25, self.p50, self.p75, self.p100]
    }

    pub fn value(&self, percentile: Percentile) -> f64 {
        self.values()[percentile.index()]
    }

    /// p0 <= p25 <= p50 <= p75 <= p100
    pub fn is_monotonic(&self) -> bool {
        self.values().windows(2).all(|w| w[0] <= w[1])
    }
}

/// One row of the intensity source table before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntensityRow {
    pub function: String,
    pub structure: String,
    pub material: String,
    /// Ordered as [`Percentile::ALL`]; `None` when the cell was empty or non-numeric
    pub percentiles: [Option<f64>; 5],
}

impl IntensityRow {
    pub fn new(
        function: impl Into<String>,
        structure: impl Into<String>,
        material: impl Into<String>,
        percentiles: [Option<f64>; 5],
    ) -> Self {
        Self {
            function: function.into(),
            structure: structure.into(),
            material: material.into(),
            percentiles,
        }
    }
}

type Palette = BTreeMap<String, IntensityRecord>;

static EMPTY_PALETTE: Palette = BTreeMap::new();

/// Immutable function -> structure -> material -> [`IntensityRecord`] table
#[derive(Debug, Clone, Default)]
pub struct MaterialIntensityTable {
    entries: BTreeMap<String, BTreeMap<String, Palette>>,
}

impl MaterialIntensityTable {
    /// Build the table from source rows.
    ///
    /// Missing percentiles are stored as 0, rows without a key are skipped,
    /// and a later duplicate (function, structure, material) row overwrites
    /// the earlier one. Every such event is returned as a [`DataWarning`].
    pub fn build<I>(rows: I) -> (Self, Vec<DataWarning>)
    where
        I: IntoIterator<Item = IntensityRow>,
    {
        let mut entries: BTreeMap<String, BTreeMap<String, Palette>> = BTreeMap::new();
        let mut warnings = Vec::new();

        for (idx, row) in rows.into_iter().enumerate() {
            if row.function.trim().is_empty()
                || row.structure.trim().is_empty()
                || row.material.trim().is_empty()
            {
                warnings.push(DataWarning::MissingKey { row: idx + 1 });
                continue;
            }

            let mut values = [0.0; 5];
            for (slot, percentile) in Percentile::ALL.iter().enumerate() {
                match row.percentiles[slot] {
                    Some(v) if v.is_finite() => values[slot] = v,
                    _ => warnings.push(DataWarning::MissingPercentile {
                        function: row.function.clone(),
                        structure: row.structure.clone(),
                        material: row.material.clone(),
                        percentile: percentile.column(),
                    }),
                }
            }

            let record = IntensityRecord::from_values(values);
            if !record.is_monotonic() {
                warnings.push(DataWarning::NonMonotonicPercentiles {
                    function: row.function.clone(),
                    structure: row.structure.clone(),
                    material: row.material.clone(),
                });
            }

            let palette = entries
                .entry(row.function)
                .or_default()
                .entry(row.structure)
                .or_default();
            if palette.insert(row.material.clone(), record).is_some() {
                debug!("duplicate intensity row for {:?}, keeping the later one", row.material);
            }
        }

        for warning in &warnings {
            warn!("material intensity: {}", warning);
        }

        (Self { entries }, warnings)
    }

    /// Material palette for a (function, structure) pair; empty when unknown
    pub fn lookup(&self, function: &str, structure: &str) -> &BTreeMap<String, IntensityRecord> {
        self.entries
            .get(function)
            .and_then(|structures| structures.get(structure))
            .unwrap_or(&EMPTY_PALETTE)
    }

    pub fn get(
        &self,
        function: &str,
        structure: &str,
        material: &str,
    ) -> Option<&IntensityRecord> {
        self.lookup(function, structure).get(material)
    }

    /// Palette entry for a user-typed material name.
    ///
    /// Exact key first, then a case-insensitive match on the trimmed name.
    /// Returns the palette's own key.
    pub fn resolve_material(
        &self,
        function: &str,
        structure: &str,
        material: &str,
    ) -> Option<(&str, &IntensityRecord)> {
        let palette = self.lookup(function, structure);
        if let Some((key, record)) = palette.get_key_value(material) {
            return Some((key.as_str(), record));
        }

        let wanted = material.trim().to_lowercase();
        palette
            .iter()
            .find(|(key, _)| key.trim().to_lowercase() == wanted)
            .map(|(key, record)| (key.as_str(), record))
    }

    /// Sorted, deduplicated function names
    pub fn list_functions(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Sorted, deduplicated structures for a function
    pub fn list_structures(&self, function: &str) -> Vec<&str> {
        self.entries
            .get(function)
            .map(|structures| structures.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Flattened (function, structure, material, record) rows in key order
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str, &str, &IntensityRecord)> + '_ {
        self.entries.iter().flat_map(|(function, structures)| {
            structures.iter().flat_map(move |(structure, palette)| {
                palette.iter().map(move |(material, record)| {
                    (function.as_str(), structure.as_str(), material.as_str(), record)
                })
            })
        })
    }

    /// Number of (function, structure, material) entries
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|structures| structures.values())
            .map(|palette| palette.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
