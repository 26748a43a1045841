//! Output formatting module

use serde::Serialize;

use embodied_app::app::DashboardSummary;
use embodied_domain::model::{
    CarbonFactorTable, IntensityRecord, MaterialIntensityTable, ProjectRecord,
};
use embodied_domain::service::CarbonBreakdown;
use embodied_types::{OutputFormat, Result};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    println!("{}", content);
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

pub fn output_names(output_format: OutputFormat, title: &str, names: &[&str]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(names);
    }

    println!("{} ({})", title, names.len());
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

#[derive(Serialize)]
struct DatabaseRow<'a> {
    function: &'a str,
    structure: &'a str,
    material: &'a str,
    #[serde(flatten)]
    intensity: &'a IntensityRecord,
}

pub fn output_database(
    output_format: OutputFormat,
    table: &MaterialIntensityTable,
    function: Option<&str>,
    structure: Option<&str>,
) -> Result<()> {
    let rows: Vec<DatabaseRow> = table
        .rows()
        .filter(|(f, _, _, _)| function.map_or(true, |want| *f == want))
        .filter(|(_, s, _, _)| structure.map_or(true, |want| *s == want))
        .map(|(function, structure, material, intensity)| DatabaseRow {
            function,
            structure,
            material,
            intensity,
        })
        .collect();

    if output_format == OutputFormat::Json {
        return print_json(&rows);
    }

    println!(
        "{:<28} {:<32} {:<20} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "Function", "Structure", "Material", "p0", "p25", "p50", "p75", "p100"
    );
    println!("{}", "-".repeat(131));
    for row in &rows {
        let v = row.intensity.values();
        println!(
            "{:<28} {:<32} {:<20} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
            truncate(row.function, 28),
            truncate(row.structure, 32),
            truncate(row.material, 20),
            v[0],
            v[1],
            v[2],
            v[3],
            v[4]
        );
    }
    println!("\n{} rows", rows.len());
    Ok(())
}

#[derive(Serialize)]
struct FactorEntry<'a> {
    material: &'a str,
    factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_of: Option<&'a str>,
}

pub fn output_factors(output_format: OutputFormat, factors: &CarbonFactorTable) -> Result<()> {
    let entries: Vec<FactorEntry> = factors
        .entries()
        .map(|(material, factor)| FactorEntry {
            material,
            factor,
            alias_of: factors.alias_source(material),
        })
        .collect();

    if output_format == OutputFormat::Json {
        return print_json(&entries);
    }

    println!("{:<32} {:>16}  Note", "Material", "kgCO2e/kg");
    println!("{}", "-".repeat(64));
    for entry in &entries {
        let note = entry
            .alias_of
            .map(|source| format!("alias of {}", source))
            .unwrap_or_default();
        println!("{:<32} {:>16.4}  {}", truncate(entry.material, 32), entry.factor, note);
    }
    Ok(())
}

pub fn output_breakdown(output_format: OutputFormat, breakdown: &CarbonBreakdown) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(breakdown);
    }

    println!("\nEmbodied Carbon Breakdown");
    println!("=========================");
    println!("Function:   {}", breakdown.function);
    println!("Structure:  {}", breakdown.structure);
    println!("Area:       {:.2} m²", breakdown.area_m2);

    if breakdown.is_empty() {
        println!("\nNo materials recorded for this function/structure combination.");
        return Ok(());
    }

    println!();
    println!(
        "{:<20} {:>10} {:>5} {:>14} {:>10} {:>14}",
        "Material", "kg/m²", "Band", "Stock (kg)", "Factor", "Carbon (kg)"
    );
    println!("{}", "-".repeat(78));
    for row in &breakdown.rows {
        let band = row.percentile.map(|p| p.label()).unwrap_or("-");
        let factor_mark = if row.factor_overridden { "*" } else { " " };
        println!(
            "{:<20} {:>10.2} {:>5} {:>14.2} {:>9.4}{} {:>14.2}",
            truncate(&row.material, 20),
            row.chosen_intensity,
            band,
            row.total_stock_kg,
            row.effective_factor,
            factor_mark,
            row.embodied_carbon_kg
        );
    }
    println!("{}", "-".repeat(78));
    println!("Total stock:           {:.2} kg", breakdown.total_stock_kg());
    println!(
        "Total embodied carbon: {:.2} kgCO2e ({:.2} tCO2e)",
        breakdown.total_carbon_kg,
        breakdown.total_carbon_tonnes()
    );
    if breakdown.rows.iter().any(|r| r.factor_overridden) {
        println!("* custom carbon factor");
    }
    Ok(())
}

pub fn output_project_list(output_format: OutputFormat, projects: &[&ProjectRecord]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(projects);
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!(
        "{:<15} {:<16} {:<28} {:>10} {:>12}  Saved",
        "ID", "Building", "Function", "Area m²", "Carbon t"
    );
    println!("{}", "-".repeat(100));
    for project in projects {
        println!(
            "{:<15} {:<16} {:<28} {:>10.1} {:>12.2}  {}",
            project.id,
            truncate(&project.building_id, 16),
            truncate(&project.function, 28),
            project.area,
            project.calculated_carbon_tonnes(),
            project.timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ProjectDetail<'a> {
    project: &'a ProjectRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<&'a CarbonBreakdown>,
}

/// Stored snapshot plus, when reference data is available, a breakdown
/// recomputed against the current tables
pub fn output_project(
    output_format: OutputFormat,
    project: &ProjectRecord,
    breakdown: Option<&CarbonBreakdown>,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(&ProjectDetail { project, breakdown });
    }

    println!("\nProject {}", project.id);
    println!("==========================");
    println!("Building ID: {}", project.building_id);
    println!("Function:    {}", project.function);
    println!("Structure:   {}", project.structural_type);
    println!("Area:        {:.2} m²", project.area);
    println!("Location:    {}", project.location);
    if let Some((lat, lng)) = project.coordinates() {
        println!("Coordinates: {:.4}, {:.4}", lat, lng);
    }
    println!("Saved at:    {}", project.timestamp.to_rfc3339());
    println!(
        "Carbon:      {:.2} kgCO2e ({:.2} tCO2e) at save time",
        project.calculated_carbon,
        project.calculated_carbon_tonnes()
    );

    if let Some(breakdown) = breakdown {
        output_breakdown(output_format, breakdown)?;
        if (breakdown.total_carbon_kg - project.calculated_carbon).abs() > 1e-6 {
            println!(
                "\nNote: current reference data gives {:.2} kgCO2e, saved snapshot {:.2} kgCO2e",
                breakdown.total_carbon_kg, project.calculated_carbon
            );
        }
    }
    Ok(())
}

pub fn output_dashboard(output_format: OutputFormat, summary: &DashboardSummary) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(summary);
    }

    println!("\nDashboard");
    println!("=========");
    println!("Projects:        {}", summary.project_count);
    println!("Total area:      {:.1} m²", summary.total_area_m2);
    println!(
        "Total carbon:    {:.2} tCO2e",
        summary.total_carbon_kg / 1000.0
    );

    if !summary.recent.is_empty() {
        println!("\nRecent projects:");
        let recent: Vec<&ProjectRecord> = summary.recent.iter().collect();
        output_project_list(output_format, &recent)?;
    }

    if !summary.markers.is_empty() {
        println!("\nLocations:");
        for marker in &summary.markers {
            println!(
                "  {:<16} ({:>9.4}, {:>9.4})  {:.2} tCO2e",
                truncate(&marker.building_id, 16),
                marker.lat,
                marker.lng,
                marker.carbon_tonnes
            );
        }
    }
    Ok(())
}
