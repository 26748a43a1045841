//! CLI definition using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use embodied_domain::model::Percentile;
use embodied_types::OutputFormat;

#[derive(Parser)]
#[command(name = "embodied-carbon")]
#[command(version)]
#[command(about = "Embodied carbon estimation from material intensity statistics")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Material intensity CSV (overrides config)
    #[arg(long, global = true)]
    pub intensity_csv: Option<PathBuf>,

    /// Carbon factor CSV (overrides config)
    #[arg(long, global = true)]
    pub factor_csv: Option<PathBuf>,

    /// Keep project changes in memory only
    #[arg(long, global = true)]
    pub no_persist: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List building functions in the intensity table
    Functions,

    /// List structural systems available for a function
    Structures {
        /// Building function (e.g., "residential multi-family")
        function: String,
    },

    /// Show the material intensity table
    Database {
        /// Only rows for this function
        #[arg(long)]
        function: Option<String>,

        /// Only rows for this structure
        #[arg(long)]
        structure: Option<String>,
    },

    /// Show the carbon factor table
    Factors,

    /// Compute a breakdown without saving a project
    Estimate {
        /// Building function
        #[arg(long)]
        function: String,

        /// Structural system
        #[arg(long)]
        structure: String,

        /// Floor area (m²); non-numeric input counts as 0
        #[arg(long, default_value = "1000", allow_hyphen_values = true)]
        area: String,

        #[command(flatten)]
        materials: MaterialArgs,
    },

    /// Manage saved projects
    Project {
        #[command(subcommand)]
        action: ProjectCommand,
    },

    /// Summary over all saved projects
    Dashboard,

    /// Export saved projects to Excel
    Export {
        /// Output Excel file path
        #[arg(long, short = 'o', default_value = "projects.xlsx")]
        output: PathBuf,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set material intensity CSV path
        #[arg(long)]
        set_intensity_csv: Option<PathBuf>,

        /// Set carbon factor CSV path
        #[arg(long)]
        set_factor_csv: Option<PathBuf>,

        /// Set project store directory
        #[arg(long)]
        set_store_dir: Option<PathBuf>,

        /// Enable/disable saving projects to disk
        #[arg(long)]
        set_persistence: Option<bool>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create and save a new project
    New {
        #[command(flatten)]
        form: ProjectForm,
    },

    /// List saved projects (newest first)
    List {
        /// Filter by building id or function
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Maximum number of entries to show
        #[arg(long, short = 'n', default_value = "50")]
        limit: usize,
    },

    /// Show a saved project with its material breakdown
    Show {
        /// Project id
        id: i64,
    },

    /// Edit and re-save a project
    Edit {
        /// Project id
        id: i64,

        #[command(flatten)]
        form: ProjectForm,

        /// Drop the custom carbon factor for a material (repeatable)
        #[arg(long = "clear-factor", value_name = "MATERIAL")]
        clear_factor: Vec<String>,
    },

    /// Delete a project
    Delete {
        /// Project id
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Project form fields; unset fields keep their current value
#[derive(Args, Debug, Clone)]
pub struct ProjectForm {
    /// Building identifier (e.g., "BLDG-001")
    #[arg(long)]
    pub building_id: Option<String>,

    /// Floor area (m²); non-numeric input counts as 0
    #[arg(long, allow_hyphen_values = true)]
    pub area: Option<String>,

    /// Building function. Changing it clears percentile choices.
    #[arg(long)]
    pub function: Option<String>,

    /// Structural system. Changing it clears percentile choices.
    #[arg(long)]
    pub structure: Option<String>,

    /// Location description
    #[arg(long)]
    pub location: Option<String>,

    /// Latitude; non-numeric input clears it
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<String>,

    /// Longitude; non-numeric input clears it
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<String>,

    #[command(flatten)]
    pub materials: MaterialArgs,
}

/// Per-material choices shared by `estimate` and the project form
#[derive(Args, Debug, Clone, Default)]
pub struct MaterialArgs {
    /// Percentile for a material, e.g. "concrete=p75" (repeatable)
    #[arg(long = "select", value_name = "MATERIAL=PERCENTILE", value_parser = parse_selection)]
    pub select: Vec<(String, Percentile)>,

    /// Explicit intensity for a material in kg/m², e.g. "steel=42.5" (repeatable)
    #[arg(long = "intensity", value_name = "MATERIAL=KG_PER_M2", value_parser = parse_number_pair)]
    pub intensity: Vec<(String, f64)>,

    /// Custom carbon factor for a material in kgCO2e/kg, e.g. "steel=1.9" (repeatable)
    #[arg(long = "factor", value_name = "MATERIAL=FACTOR", value_parser = parse_number_pair)]
    pub factor: Vec<(String, f64)>,
}

fn split_pair(arg: &str) -> Result<(String, &str), String> {
    let (material, value) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected MATERIAL=VALUE, got {:?}", arg))?;
    let material = material.trim();
    if material.is_empty() {
        return Err(format!("missing material name in {:?}", arg));
    }
    Ok((material.to_string(), value.trim()))
}

fn parse_selection(arg: &str) -> Result<(String, Percentile), String> {
    let (material, value) = split_pair(arg)?;
    Ok((material, value.parse()?))
}

fn parse_number_pair(arg: &str) -> Result<(String, f64), String> {
    let (material, value) = split_pair(arg)?;
    let number: f64 = value
        .parse()
        .map_err(|_| format!("{:?} is not a number", value))?;
    if !number.is_finite() {
        return Err(format!("{:?} is not a finite number", value));
    }
    Ok((material, number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("concrete=p75").unwrap(),
            ("concrete".to_string(), Percentile::P75)
        );
        assert_eq!(
            parse_selection("brick (red) = P0").unwrap(),
            ("brick (red)".to_string(), Percentile::P0)
        );
        assert!(parse_selection("concrete").is_err());
        assert!(parse_selection("=p50").is_err());
        assert!(parse_selection("concrete=p60").is_err());
    }

    #[test]
    fn test_parse_number_pair() {
        assert_eq!(
            parse_number_pair("steel=1.9").unwrap(),
            ("steel".to_string(), 1.9)
        );
        assert!(parse_number_pair("steel=abc").is_err());
        assert!(parse_number_pair("steel=inf").is_err());
    }

    #[test]
    fn test_edit_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "embodied-carbon",
            "project",
            "edit",
            "42",
            "--lat",
            "-6.2",
            "--structure",
            "steel frame",
            "--select",
            "concrete=p75",
        ])
        .unwrap();
        match cli.command {
            Commands::Project {
                action: ProjectCommand::Edit { id, form, .. },
            } => {
                assert_eq!(id, 42);
                assert_eq!(form.lat.as_deref(), Some("-6.2"));
                assert_eq!(form.structure.as_deref(), Some("steel frame"));
                assert_eq!(form.materials.select.len(), 1);
            }
            _ => panic!("expected project edit"),
        }
    }
}
