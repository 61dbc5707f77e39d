//! site-clip: buffer a site, clip a DEM and boundary layers to it, and
//! package the results for HEC-RAS and QGIS.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clip_common::ClipError;
use clipper::{load_inputs, run_clip, ClipConfig, RunSummary};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use site_clip::config::{load_config, CliOverrides};
use site_clip::hecras::export_hecras;
use site_clip::qgis::{project_path, validate_qgis_project, write_qgis_project};
use site_clip::report::{format_asset_report, format_output_report, format_run_summaries, validate_run_outputs};
use site_clip::validation::{check_site_in_raster, validate_asset_dem, validate_asset_layers, validate_asset_site};

#[derive(Parser, Debug)]
#[command(name = "site-clip")]
#[command(about = "Clip a DEM and boundary layers to a buffer around a site", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "SITE_CLIP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Buffer the site, clip every input and write the packages
    Run {
        #[command(flatten)]
        overrides: CliOverrides,

        /// Do not write the HEC-RAS package
        #[arg(long)]
        skip_hecras: bool,

        /// Do not write the QGIS project
        #[arg(long)]
        skip_qgis: bool,

        /// Summary format
        #[arg(long, value_enum, default_value_t = SummaryFormat::Table)]
        output: SummaryFormat,
    },

    /// Check the inputs without writing anything
    Validate {
        #[command(flatten)]
        overrides: CliOverrides,
    },

    /// Re-read the outputs of a previous run and check them
    Report {
        #[command(flatten)]
        overrides: CliOverrides,
    },
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => fmt().with_env_filter(filter).with_target(true).with_level(true).json().init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(false).with_level(true).init(),
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Run {
            overrides,
            skip_hecras,
            skip_qgis,
            output,
        } => {
            let config = load_config(cli.config.as_deref(), &overrides)?;
            let summaries = run(&config, skip_hecras, skip_qgis)?;

            match output {
                SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
                SummaryFormat::Table => println!("{}", format_run_summaries(&summaries)),
            }
            Ok(())
        }
        Commands::Validate { overrides } => {
            let config = load_config(cli.config.as_deref(), &overrides)?;
            let dem = validate_asset_dem(&config.raster);
            let site = validate_asset_site(&config.site_file, &config.raster);
            let layers = validate_asset_layers(&config.boundary_dir, &config.include);
            println!("{}", format_asset_report(&dem, &site, &layers));

            if !dem.valid || !site.valid || !layers.valid {
                bail!("Input validation failed");
            }
            Ok(())
        }
        Commands::Report { overrides } => {
            let config = load_config(cli.config.as_deref(), &overrides)?;
            let runs = config
                .runs()
                .iter()
                .map(validate_run_outputs)
                .collect::<Result<Vec<_>>>()
                .context("Failed to read outputs; run `site-clip run` first")?;

            let project = match config.runs().iter().find(|r| r.label == "qgis") {
                Some(run) => {
                    let path = project_path(&run.output_dir, &run.suffix());
                    if path.exists() {
                        Some(validate_qgis_project(&path)?)
                    } else {
                        warn!(path = %path.display(), "QGIS project not found");
                        None
                    }
                }
                None => None,
            };

            println!("{}", format_output_report(&runs, project.as_ref()));

            if runs.iter().any(|r| !r.is_valid()) || project.as_ref().is_some_and(|p| !p.valid) {
                bail!("Output validation failed");
            }
            Ok(())
        }
    }
}

fn run(config: &ClipConfig, skip_hecras: bool, skip_qgis: bool) -> Result<Vec<RunSummary>> {
    let dem = validate_asset_dem(&config.raster);
    if let Some(error) = &dem.error {
        bail!("Invalid elevation raster {}: {}", config.raster.display(), error);
    }
    if !dem.has_data {
        warn!(path = %config.raster.display(), "Elevation raster holds no positive samples");
    }

    let inputs = load_inputs(config).map_err(log_clip_error)?;
    check_site_in_raster(&inputs.site, &inputs.raster)?;

    let mut summaries = Vec::new();
    for spec in config.runs() {
        let summary = run_clip(&inputs, &spec, config).map_err(log_clip_error)?;
        info!(
            run = %summary.label,
            dem_pixels = summary.dem.count,
            layers = summary.layers.len(),
            empty_layers = summary.empty_layer_count(),
            "Run complete"
        );
        summaries.push(summary);
    }

    if !skip_hecras {
        if let Some(primary) = summaries.first() {
            export_hecras(primary, &config.hecras_dir())?;
        }
    }

    if !skip_qgis {
        if let Some(qgis_run) = summaries.iter().find(|s| s.label == "qgis") {
            let path = write_qgis_project(qgis_run)?;
            let check = validate_qgis_project(&path)?;
            if !check.valid {
                warn!(path = %path.display(), missing = ?check.missing, "QGIS project references missing files");
            }
        }
    }

    Ok(summaries)
}

fn log_clip_error(err: ClipError) -> anyhow::Error {
    error!(kind = err.kind(), input_error = err.is_input_error(), "{}", err);
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_format_is_checked() {
        let cli = Cli::try_parse_from(["site-clip", "run", "--output", "json"]).unwrap();
        let Commands::Run { output, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(output, SummaryFormat::Json);

        assert!(Cli::try_parse_from(["site-clip", "run", "--output", "yaml"]).is_err());
    }

    #[test]
    fn test_summary_format_defaults_to_table() {
        let cli = Cli::try_parse_from(["site-clip", "run"]).unwrap();
        let Commands::Run { output, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(output, SummaryFormat::Table);
    }
}
