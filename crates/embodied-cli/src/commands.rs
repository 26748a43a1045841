//! Command handlers

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use crate::cli::{Cli, Commands, MaterialArgs, ProjectCommand, ProjectForm};
use crate::output::{
    output_breakdown, output_dashboard, output_database, output_factors, output_names,
    output_project, output_project_list,
};
use embodied_app::app::{Durability, ProjectService};
use embodied_app::config::Config;
use embodied_app::export::export_to_excel;
use embodied_app::reference::ReferenceData;
use embodied_app::repository::open_project_service;
use embodied_domain::model::{coerce_number, ProjectDraft, ProjectId};
use embodied_types::{Error, OutputFormat, Result};

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;

    if let Some(ref path) = cli.intensity_csv {
        config.intensity_csv = path.clone();
    }
    if let Some(ref path) = cli.factor_csv {
        config.carbon_factor_csv = path.clone();
    }
    if cli.no_persist {
        config.persistence_enabled = false;
    }

    let output_format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Functions => cmd_functions(&config, output_format),
        Commands::Structures { function } => cmd_structures(&config, &function, output_format),
        Commands::Database {
            function,
            structure,
        } => {
            let reference = ReferenceData::load(&config)?;
            output_database(
                output_format,
                &reference.intensity,
                function.as_deref(),
                structure.as_deref(),
            )
        }
        Commands::Factors => {
            let reference = ReferenceData::load(&config)?;
            output_factors(output_format, &reference.factors)
        }
        Commands::Estimate {
            function,
            structure,
            area,
            materials,
        } => cmd_estimate(&config, &function, &structure, &area, &materials, output_format),
        Commands::Project { action } => cmd_project(&config, action, output_format),
        Commands::Dashboard => {
            let service = open_project_service(&config);
            output_dashboard(output_format, &service.dashboard())
        }
        Commands::Export { output } => cmd_export(&config, output),
        Commands::Config {
            show,
            set_intensity_csv,
            set_factor_csv,
            set_store_dir,
            set_persistence,
            set_output,
            reset,
        } => cmd_config(
            show,
            set_intensity_csv,
            set_factor_csv,
            set_store_dir,
            set_persistence,
            set_output,
            reset,
        ),
    }
}

fn cmd_functions(config: &Config, output_format: OutputFormat) -> Result<()> {
    let reference = ReferenceData::load(config)?;
    output_names(
        output_format,
        "Building functions",
        &reference.intensity.list_functions(),
    )
}

fn cmd_structures(config: &Config, function: &str, output_format: OutputFormat) -> Result<()> {
    let reference = ReferenceData::load(config)?;
    let structures = reference.intensity.list_structures(function);
    if structures.is_empty() {
        eprintln!("No structural systems recorded for function '{}'", function);
    }
    output_names(
        output_format,
        &format!("Structural systems for {}", function),
        &structures,
    )
}

fn cmd_estimate(
    config: &Config,
    function: &str,
    structure: &str,
    area: &str,
    materials: &MaterialArgs,
    output_format: OutputFormat,
) -> Result<()> {
    let reference = ReferenceData::load(config)?;

    let mut draft = ProjectDraft::new();
    draft.set_function(function.trim());
    draft.set_structure(structure.trim());
    draft.set_area(coerce_number(area));
    apply_materials(&mut draft, materials, &reference);

    output_breakdown(output_format, &reference.breakdown(&draft))
}

fn cmd_project(config: &Config, action: ProjectCommand, output_format: OutputFormat) -> Result<()> {
    let mut service = open_project_service(config);

    match action {
        ProjectCommand::New { form } => {
            let reference = ReferenceData::load(config)?;
            let mut draft = ProjectDraft::new();
            apply_form(&mut draft, &form, &reference);
            save_and_report(&mut service, &draft, &reference, output_format)
        }
        ProjectCommand::List { search, limit } => {
            let matches = service.search(search.as_deref().unwrap_or(""));
            let shown: Vec<_> = matches.into_iter().take(limit).collect();
            output_project_list(output_format, &shown)
        }
        ProjectCommand::Show { id } => {
            let project = service.find(id).ok_or(Error::ProjectNotFound(id))?;
            let breakdown = match ReferenceData::load(config) {
                Ok(reference) => Some(reference.breakdown(&ProjectDraft::from_record(project))),
                Err(e) => {
                    eprintln!("Warning: {}; showing the saved snapshot only", e);
                    None
                }
            };
            output_project(output_format, project, breakdown.as_ref())
        }
        ProjectCommand::Edit {
            id,
            form,
            clear_factor,
        } => {
            let reference = ReferenceData::load(config)?;
            let mut draft = service.load_draft(id).ok_or(Error::ProjectNotFound(id))?;
            apply_form(&mut draft, &form, &reference);
            for material in &clear_factor {
                if !draft.clear_factor_override(material.trim()) {
                    eprintln!("No custom carbon factor set for '{}'", material);
                }
            }
            save_and_report(&mut service, &draft, &reference, output_format)
        }
        ProjectCommand::Delete { id, yes } => cmd_delete(&mut service, id, yes),
    }
}

/// Apply form fields to a draft.
///
/// Function/structure are applied before material choices so a palette
/// change clears stale selections first.
fn apply_form(draft: &mut ProjectDraft, form: &ProjectForm, reference: &ReferenceData) {
    if let Some(ref building_id) = form.building_id {
        draft.set_building_id(building_id.trim());
    }
    if let Some(ref area) = form.area {
        draft.set_area(coerce_number(area));
    }
    if let Some(ref location) = form.location {
        draft.set_location(location.trim());
    }
    if form.lat.is_some() || form.lng.is_some() {
        let (lat, lng) = draft.coordinates();
        draft.set_coordinates(
            form.lat.as_deref().map_or(lat, parse_coordinate),
            form.lng.as_deref().map_or(lng, parse_coordinate),
        );
    }

    let mut reset = false;
    if let Some(ref function) = form.function {
        reset |= draft.set_function(function.trim());
    }
    if let Some(ref structure) = form.structure {
        reset |= draft.set_structure(structure.trim());
    }
    if reset && draft.id().is_some() {
        eprintln!("Function/structure changed: material selections reset to p50 defaults");
    }

    if reference
        .intensity
        .lookup(draft.function(), draft.structure())
        .is_empty()
    {
        eprintln!(
            "Warning: no materials recorded for '{}' / '{}'",
            draft.function(),
            draft.structure()
        );
    }

    apply_materials(draft, &form.materials, reference);
}

/// Material choices only apply to palette materials; anything else is
/// reported and skipped
fn apply_materials(draft: &mut ProjectDraft, materials: &MaterialArgs, reference: &ReferenceData) {
    let table = &reference.intensity;
    let mut skipped = Vec::new();

    for (material, percentile) in &materials.select {
        match draft.select_percentile(table, material, *percentile) {
            Some(value) => debug!("{} set to {} ({:.2} kg/m²)", material, percentile, value),
            None => skipped.push(("selection", material)),
        }
    }
    for (material, intensity) in &materials.intensity {
        if draft.set_intensity(table, material, *intensity).is_none() {
            skipped.push(("intensity", material));
        }
    }
    for (material, factor) in &materials.factor {
        if draft.set_factor_override(table, material, *factor).is_none() {
            skipped.push(("carbon factor", material));
        }
    }

    for (kind, material) in skipped {
        eprintln!(
            "Warning: '{}' is not a material of {} / {}; {} ignored",
            material,
            draft.function(),
            draft.structure(),
            kind
        );
    }
}

/// Non-numeric coordinates clear the value
fn parse_coordinate(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn save_and_report(
    service: &mut ProjectService,
    draft: &ProjectDraft,
    reference: &ReferenceData,
    output_format: OutputFormat,
) -> Result<()> {
    let (record, durability) = service.save_draft(draft, reference, Utc::now())?;

    if output_format == OutputFormat::Table {
        println!(
            "Saved project {} ({}): {:.2} tCO2e",
            record.id,
            record.building_id,
            record.calculated_carbon_tonnes()
        );
    }
    warn_if_not_durable(durability);

    output_project(output_format, &record, Some(&reference.breakdown(draft)))
}

fn cmd_delete(service: &mut ProjectService, id: ProjectId, yes: bool) -> Result<()> {
    let project = service.find(id).ok_or(Error::ProjectNotFound(id))?;

    if !yes {
        let prompt = format!(
            "Delete project {} ({})? [y/N] ",
            project.id, project.building_id
        );
        if !confirm(&prompt)? {
            println!("Cancelled");
            return Ok(());
        }
    }

    let durability = service.delete(id)?;
    println!("Deleted project {}", id);
    warn_if_not_durable(durability);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{}", prompt);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn warn_if_not_durable(durability: Durability) {
    if durability == Durability::InMemoryOnly {
        eprintln!("Warning: project storage is unavailable; this change was not saved to disk");
    }
}

fn cmd_export(config: &Config, output: PathBuf) -> Result<()> {
    let service = open_project_service(config);
    if service.projects().is_empty() {
        println!("No projects to export");
        return Ok(());
    }

    export_to_excel(service.projects(), &output)?;
    println!(
        "Exported {} projects to {}",
        service.projects().len(),
        output.display()
    );
    Ok(())
}

fn cmd_config(
    show: bool,
    set_intensity_csv: Option<PathBuf>,
    set_factor_csv: Option<PathBuf>,
    set_store_dir: Option<PathBuf>,
    set_persistence: Option<bool>,
    set_output: Option<OutputFormat>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    if let Some(path) = set_intensity_csv {
        config.intensity_csv = path;
        modified = true;
    }

    if let Some(path) = set_factor_csv {
        config.carbon_factor_csv = path;
        modified = true;
    }

    if let Some(dir) = set_store_dir {
        config.store_dir = Some(dir);
        modified = true;
    }

    if let Some(enabled) = set_persistence {
        config.persistence_enabled = enabled;
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    if modified {
        config.save()?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("\n{}", config);
    }

    Ok(())
}
