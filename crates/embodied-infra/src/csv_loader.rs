//! CSV loaders for the material intensity and carbon factor tables
//!
//! Only whole-file problems (unreadable file, bad CSV, missing column) are
//! errors. Bad cells are passed through as `None` / raw text and handled by
//! the table builders as data-quality warnings.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use embodied_domain::model::{FactorRow, IntensityRow, Percentile};

#[derive(Error, Debug)]
pub enum CsvLoaderError {
    #[error("Failed to read file {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

impl From<CsvLoaderError> for embodied_types::Error {
    fn from(err: CsvLoaderError) -> Self {
        embodied_types::Error::DataLoad(err.to_string())
    }
}

/// Prefix of the factor column; the source spells it "CO2e" or "CO₂e"
const FACTOR_COLUMN_PREFIX: &str = "embodied carbon";

/// Load intensity rows from a CSV file
///
/// Expected CSV header (any order, extra columns ignored):
/// material,function,structure,p_0,p_25,p_50,p_75,p_100
pub fn load_intensity_rows<P: AsRef<Path>>(path: P) -> Result<Vec<IntensityRow>, CsvLoaderError> {
    let file = open(path.as_ref())?;
    load_intensity_rows_from_reader(file)
}

pub fn load_intensity_rows_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<IntensityRow>, CsvLoaderError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();

    let material_col = find_column(&headers, "material")?;
    let function_col = find_column(&headers, "function")?;
    let structure_col = find_column(&headers, "structure")?;
    let mut percentile_cols = [0usize; 5];
    for (slot, percentile) in Percentile::ALL.iter().enumerate() {
        percentile_cols[slot] = find_column(&headers, percentile.column())?;
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        rows.push(IntensityRow {
            function: cell(function_col).to_string(),
            structure: cell(structure_col).to_string(),
            material: cell(material_col).to_string(),
            percentiles: percentile_cols.map(|idx| parse_number(cell(idx))),
        });
    }

    debug!("read {} material intensity rows", rows.len());
    Ok(rows)
}

/// Load carbon factor rows from a CSV file
///
/// Expected CSV header:
/// Material,Embodied Carbon (kg CO2e / kg)
pub fn load_factor_rows<P: AsRef<Path>>(path: P) -> Result<Vec<FactorRow>, CsvLoaderError> {
    let file = open(path.as_ref())?;
    load_factor_rows_from_reader(file)
}

pub fn load_factor_rows_from_reader<R: Read>(reader: R) -> Result<Vec<FactorRow>, CsvLoaderError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();

    let material_col = find_column(&headers, "material")?;
    let factor_col = headers
        .iter()
        .position(|h| normalize_header(h).starts_with(FACTOR_COLUMN_PREFIX))
        .ok_or_else(|| {
            CsvLoaderError::MissingColumn("Embodied Carbon (kg CO2e / kg)".to_string())
        })?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let material = record.get(material_col).unwrap_or("");
        let expression = record.get(factor_col).unwrap_or("");
        if material.is_empty() && expression.is_empty() {
            continue;
        }
        rows.push(FactorRow::new(material, expression));
    }

    debug!("read {} carbon factor rows", rows.len());
    Ok(rows)
}

fn open(path: &Path) -> Result<File, CsvLoaderError> {
    File::open(path).map_err(|source| CsvLoaderError::IoError {
        path: path.display().to_string(),
        source,
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize, CsvLoaderError> {
    headers
        .iter()
        .position(|h| normalize_header(h) == name)
        .ok_or_else(|| CsvLoaderError::MissingColumn(name.to_string()))
}

/// Empty or non-numeric cells are `None`
fn parse_number(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("non-numeric percentile value {:?}", s);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INTENSITY_CSV: &str = "\
material,function,structure,n,p_0,p_25,p_50,p_75,p_100
concrete,residential multi-family,reinforced concrete structure,12,400,600,800,1000,1400
steel,residential multi-family,reinforced concrete structure,12,20,35,50,70,110
glass,residential multi-family,reinforced concrete structure,3,1,2,,4,5
";

    const FACTOR_CSV: &str = "\
Material,Embodied Carbon (kg CO\u{2082}e / kg)
Concrete,0.1 \u{2013} 0.2
\"Brick (Red)\",0.2 - 0.3
Steel,1.85
Mystery,n/a
";

    #[test]
    fn test_load_intensity_rows() {
        let rows = load_intensity_rows_from_reader(INTENSITY_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].material, "concrete");
        assert_eq!(rows[0].function, "residential multi-family");
        assert_eq!(
            rows[0].percentiles,
            [Some(400.0), Some(600.0), Some(800.0), Some(1000.0), Some(1400.0)]
        );
        assert_eq!(rows[2].percentiles[2], None);
    }

    #[test]
    fn test_intensity_columns_in_any_order() {
        let csv = "p_100,p_75,p_50,p_25,p_0,structure,function,material\n5,4,3,2,1,s,f,m\n";
        let rows = load_intensity_rows_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].percentiles, [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        assert_eq!(rows[0].material, "m");
    }

    #[test]
    fn test_intensity_missing_column() {
        let csv = "material,function,p_0,p_25,p_50,p_75,p_100\n";
        let err = load_intensity_rows_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CsvLoaderError::MissingColumn(ref c) if c == "structure"));
    }

    #[test]
    fn test_non_numeric_cell_is_none() {
        let csv = "material,function,structure,p_0,p_25,p_50,p_75,p_100\nm,f,s,1,x,3,4,5\n";
        let rows = load_intensity_rows_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].percentiles[1], None);
    }

    #[test]
    fn test_load_factor_rows() {
        let rows = load_factor_rows_from_reader(FACTOR_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], FactorRow::new("Brick (Red)", "0.2 - 0.3"));
        assert_eq!(rows[3].expression, "n/a");
    }

    #[test]
    fn test_factor_header_ascii_variant() {
        let csv = "\u{feff}Material,Embodied Carbon (kg CO2e / kg)\nTimber,0.45\n";
        let rows = load_factor_rows_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows, vec![FactorRow::new("Timber", "0.45")]);
    }

    #[test]
    fn test_factor_missing_column() {
        let csv = "Material,Density\nTimber,500\n";
        let err = load_factor_rows_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CsvLoaderError::MissingColumn(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("material-intensity.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(INTENSITY_CSV.as_bytes()).unwrap();

        let rows = load_intensity_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        let err = load_factor_rows("/nonexistent/embodied carbon.csv").unwrap_err();
        assert!(matches!(err, CsvLoaderError::IoError { .. }));
    }
}
