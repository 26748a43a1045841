//! Carbon factor reference table (kg CO2e per kg of material)

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::warning::DataWarning;

/// Declared (source key -> alias key) pairs, applied after the base table is
/// built. Matching is by exact lower-cased key only.
pub const FACTOR_ALIASES: &[(&str, &str)] = &[("brick (red)", "brick")];

/// Dashes that separate the two bounds of a factor range
const RANGE_DASHES: [char; 2] = ['\u{2013}', '\u{2014}'];

/// Parse a factor expression.
///
/// `"low – high"` yields the mean of both bounds, a single number yields
/// itself, anything else yields `None`. Each number is read from the leading
/// numeric part of its text, so `"2.89 (avg)"` reads as 2.89. An ASCII
/// hyphen also separates a range, but only after a complete number, so
/// `"1e-3"` and `"-0.5"` stay single values.
pub fn parse_factor_expression(expression: &str) -> Option<f64> {
    let trimmed = expression.trim();

    let parts: Vec<&str> = trimmed.split(&RANGE_DASHES[..]).collect();
    if parts.len() == 2 {
        if let (Some(low), Some(high)) = (leading_number(parts[0]), leading_number(parts[1])) {
            return Some((low + high) / 2.0);
        }
    }

    if let Some((low, high)) = trimmed.split_once('-') {
        let low = low.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        if let (Some(low), Some(high)) = (low, leading_number(high)) {
            return Some((low + high) / 2.0);
        }
    }

    leading_number(trimmed)
}

/// Longest numeric prefix of `text`, ignoring surrounding whitespace
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let numeric_len = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .map_or(text.len(), |(idx, _)| idx);

    (1..=numeric_len)
        .rev()
        .find_map(|len| text[..len].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// One row of the carbon factor source table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactorRow {
    pub material: String,
    pub expression: String,
}

impl FactorRow {
    pub fn new(material: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            expression: expression.into(),
        }
    }
}

/// Immutable, case-insensitive material -> factor table
#[derive(Debug, Clone, Default)]
pub struct CarbonFactorTable {
    factors: BTreeMap<String, f64>,
    /// alias key -> source key, for aliases actually applied
    aliases: BTreeMap<String, String>,
}

impl CarbonFactorTable {
    /// Build with the declared [`FACTOR_ALIASES`]
    pub fn build<I>(rows: I) -> (Self, Vec<DataWarning>)
    where
        I: IntoIterator<Item = FactorRow>,
    {
        Self::build_with_aliases(rows, FACTOR_ALIASES)
    }

    pub fn build_with_aliases<I>(rows: I, aliases: &[(&str, &str)]) -> (Self, Vec<DataWarning>)
    where
        I: IntoIterator<Item = FactorRow>,
    {
        let mut factors = BTreeMap::new();
        let mut warnings = Vec::new();

        for (idx, row) in rows.into_iter().enumerate() {
            let key = normalize_key(&row.material);
            if key.is_empty() {
                warnings.push(DataWarning::MissingKey { row: idx + 1 });
                continue;
            }

            let value = match parse_factor_expression(&row.expression) {
                Some(v) if v < 0.0 => {
                    warnings.push(DataWarning::NegativeFactor {
                        material: key.clone(),
                        value: v,
                    });
                    0.0
                }
                Some(v) => v,
                None => {
                    warnings.push(DataWarning::UnparsableFactor {
                        material: key.clone(),
                        expression: row.expression.clone(),
                    });
                    0.0
                }
            };
            factors.insert(key, value);
        }

        let mut applied = BTreeMap::new();
        for (source, alias) in aliases {
            let source = normalize_key(source);
            let alias = normalize_key(alias);

            if factors.contains_key(&alias) {
                warnings.push(DataWarning::AliasShadowed { source, alias });
                continue;
            }
            match factors.get(&source).copied() {
                Some(value) => {
                    debug!("carbon factor alias {:?} -> {:?} = {}", alias, source, value);
                    factors.insert(alias.clone(), value);
                    applied.insert(alias, source);
                }
                None => warnings.push(DataWarning::AliasSourceMissing { source, alias }),
            }
        }

        for warning in &warnings {
            warn!("carbon factor: {}", warning);
        }

        (
            Self {
                factors,
                aliases: applied,
            },
            warnings,
        )
    }

    /// Factor for a material, case-insensitive
    pub fn lookup(&self, material: &str) -> Option<f64> {
        self.factors.get(&normalize_key(material)).copied()
    }

    /// Factor for a material, 0 when unmapped
    pub fn factor_or_zero(&self, material: &str) -> f64 {
        self.lookup(material).unwrap_or(0.0)
    }

    /// All (key, factor) entries including applied aliases, in key order
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.factors.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn alias_source(&self, key: &str) -> Option<&str> {
        self.aliases.get(&normalize_key(key)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

fn normalize_key(material: &str) -> String {
    material.trim().to_lowercase()
}
