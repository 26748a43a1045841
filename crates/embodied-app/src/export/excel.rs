//! Excel export functionality

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use embodied_domain::model::ProjectRecord;
use embodied_types::{Error, Result};

fn xlsx_error(e: XlsxError) -> Error {
    Error::Excel(e.to_string())
}

/// Export saved projects to an Excel file
pub fn export_to_excel(projects: &[ProjectRecord], output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    let projects_sheet = workbook.add_worksheet();
    write_projects_sheet(projects_sheet, projects)?;

    let materials_sheet = workbook.add_worksheet();
    write_materials_sheet(materials_sheet, projects)?;

    workbook.save(output_path).map_err(xlsx_error)?;

    Ok(())
}

fn write_projects_sheet(sheet: &mut Worksheet, projects: &[ProjectRecord]) -> Result<()> {
    sheet.set_name("Projects").map_err(xlsx_error)?;

    let header_format = Format::new().set_bold();
    let headers = [
        "ID",
        "Building ID",
        "Function",
        "Structure",
        "Area (m²)",
        "Location",
        "Latitude",
        "Longitude",
        "Embodied Carbon (kgCO2e)",
        "Embodied Carbon (tCO2e)",
        "Saved At",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_error)?;
    }

    for (idx, project) in projects.iter().enumerate() {
        let row = (idx + 1) as u32;
        sheet
            .write_number(row, 0, project.id as f64)
            .map_err(xlsx_error)?;
        sheet
            .write_string(row, 1, &project.building_id)
            .map_err(xlsx_error)?;
        sheet
            .write_string(row, 2, &project.function)
            .map_err(xlsx_error)?;
        sheet
            .write_string(row, 3, &project.structural_type)
            .map_err(xlsx_error)?;
        sheet.write_number(row, 4, project.area).map_err(xlsx_error)?;
        sheet
            .write_string(row, 5, &project.location)
            .map_err(xlsx_error)?;
        if let Some(lat) = project.lat {
            sheet.write_number(row, 6, lat).map_err(xlsx_error)?;
        }
        if let Some(lng) = project.lng {
            sheet.write_number(row, 7, lng).map_err(xlsx_error)?;
        }
        sheet
            .write_number(row, 8, project.calculated_carbon)
            .map_err(xlsx_error)?;
        sheet
            .write_number(row, 9, project.calculated_carbon_tonnes())
            .map_err(xlsx_error)?;
        sheet
            .write_string(row, 10, project.timestamp.to_rfc3339())
            .map_err(xlsx_error)?;
    }

    sheet.set_column_width(1, 16).map_err(xlsx_error)?;
    sheet.set_column_width(2, 28).map_err(xlsx_error)?;
    sheet.set_column_width(3, 32).map_err(xlsx_error)?;

    Ok(())
}

/// One row per (project, material) with the stored intensity and any override
fn write_materials_sheet(sheet: &mut Worksheet, projects: &[ProjectRecord]) -> Result<()> {
    sheet.set_name("Materials").map_err(xlsx_error)?;

    let header_format = Format::new().set_bold();
    let headers = [
        "Project ID",
        "Building ID",
        "Material",
        "Intensity (kg/m²)",
        "Custom Factor (kgCO2e/kg)",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_error)?;
    }

    let mut row = 1u32;
    for project in projects {
        let materials = project
            .material_selections
            .keys()
            .chain(
                project
                    .custom_carbon_factors
                    .keys()
                    .filter(|m| !project.material_selections.contains_key(*m)),
            );

        for material in materials {
            sheet
                .write_number(row, 0, project.id as f64)
                .map_err(xlsx_error)?;
            sheet
                .write_string(row, 1, &project.building_id)
                .map_err(xlsx_error)?;
            sheet.write_string(row, 2, material).map_err(xlsx_error)?;
            if let Some(intensity) = project.material_selections.get(material) {
                sheet.write_number(row, 3, *intensity).map_err(xlsx_error)?;
            }
            if let Some(factor) = project.custom_carbon_factors.get(material) {
                sheet.write_number(row, 4, *factor).map_err(xlsx_error)?;
            }
            row += 1;
        }
    }

    sheet.set_column_width(2, 24).map_err(xlsx_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn test_export_writes_file() {
        let mut selections = BTreeMap::new();
        selections.insert("concrete".to_string(), 800.0);
        let mut factors = BTreeMap::new();
        factors.insert("steel".to_string(), 1.9);

        let project = ProjectRecord {
            id: 1,
            building_id: "BLDG-001".to_string(),
            area: 1000.0,
            function: "residential multi-family".to_string(),
            structural_type: "reinforced concrete structure".to_string(),
            location: "Jakarta, Indonesia".to_string(),
            lat: None,
            lng: None,
            calculated_carbon: 120_000.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            material_selections: selections,
            custom_carbon_factors: factors,
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.xlsx");
        export_to_excel(&[project], &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
