//! Configuration loading for the site-clip CLI.
//!
//! Settings are layered: built-in defaults, then an optional YAML file (with
//! `${VAR}` / `${VAR:-default}` substitution), then `SITE_CLIP_*` environment
//! variables, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use clipper::ClipConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vector_layer::LayerFormat;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "SITE_CLIP_";

pub const DEFAULT_SITE_FILE: &str = "coordinate.txt";
pub const DEFAULT_RASTER: &str = "assets/dem.tif";
pub const DEFAULT_BOUNDARY_DIR: &str = "assets/boundaries";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// YAML config file. Every field is optional; missing ones keep their
/// default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub site_file: Option<PathBuf>,
    pub raster: Option<PathBuf>,
    pub boundary_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub buffer_radius_m: Option<f64>,
    /// `null` keeps the default; use `enable_qgis: false` to disable the run
    pub qgis_radius_m: Option<f64>,
    pub enable_qgis: Option<bool>,
    pub segments: Option<usize>,
    pub partial_overlap_warning: Option<f64>,
    pub include: Option<Vec<String>>,
    /// `shapefile` or `geojson`
    pub buffer_format: Option<LayerFormat>,
}

/// Path and radius flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct CliOverrides {
    /// Coordinate file holding `lat, lon`
    #[arg(long)]
    pub site_file: Option<PathBuf>,

    /// Elevation GeoTIFF
    #[arg(long)]
    pub raster: Option<PathBuf>,

    /// Directory of shapefile or GeoJSON boundary layers
    #[arg(long)]
    pub boundary_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Primary (HEC-RAS) buffer radius in meters
    #[arg(long)]
    pub radius: Option<f64>,

    /// Secondary (QGIS) buffer radius in meters
    #[arg(long)]
    pub qgis_radius: Option<f64>,

    /// Skip the secondary QGIS run
    #[arg(long)]
    pub no_qgis: bool,

    /// Vertices of the buffer polygon
    #[arg(long)]
    pub segments: Option<usize>,

    /// Only process these layer stems (repeatable)
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Format of the written buffer layer (shapefile or geojson)
    #[arg(long)]
    pub buffer_format: Option<LayerFormat>,
}

/// Build the effective configuration from all layers.
pub fn load_config(path: Option<&Path>, cli: &CliOverrides) -> Result<ClipConfig> {
    let mut config = default_config();

    if let Some(path) = path {
        let file = load_file_config(path)?;
        apply_file(&mut config, file);
        debug!(path = %path.display(), "Loaded config file");
    }

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    apply_cli(&mut config, cli);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub fn default_config() -> ClipConfig {
    ClipConfig::new(DEFAULT_SITE_FILE, DEFAULT_RASTER, DEFAULT_BOUNDARY_DIR, DEFAULT_OUTPUT_DIR)
}

/// Read and parse a YAML config file with environment substitution.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config from {:?}", path))?;
    let expanded = expand_env_vars(&content)?;
    serde_yaml::from_str(&expanded).with_context(|| format!("Failed to parse config YAML from {:?}", path))
}

pub fn apply_file(config: &mut ClipConfig, file: FileConfig) {
    if let Some(v) = file.site_file {
        config.site_file = v;
    }
    if let Some(v) = file.raster {
        config.raster = v;
    }
    if let Some(v) = file.boundary_dir {
        config.boundary_dir = v;
    }
    if let Some(v) = file.output_dir {
        config.output_dir = v;
    }
    if let Some(v) = file.buffer_radius_m {
        config.buffer_radius_m = v;
    }
    if let Some(v) = file.qgis_radius_m {
        config.qgis_radius_m = Some(v);
    }
    if file.enable_qgis == Some(false) {
        config.qgis_radius_m = None;
    }
    if let Some(v) = file.segments {
        config.segments = v;
    }
    if let Some(v) = file.partial_overlap_warning {
        config.partial_overlap_warning = v;
    }
    if let Some(v) = file.include {
        config.include = v;
    }
    if let Some(v) = file.buffer_format {
        config.buffer_format = v;
    }
}

/// Apply `SITE_CLIP_*` overrides read through `lookup`.
///
/// `SITE_CLIP_QGIS_RADIUS_M=off` disables the secondary run.
pub fn apply_env<F>(config: &mut ClipConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("SITE_FILE") {
        config.site_file = PathBuf::from(v);
    }
    if let Some(v) = var("RASTER") {
        config.raster = PathBuf::from(v);
    }
    if let Some(v) = var("BOUNDARY_DIR") {
        config.boundary_dir = PathBuf::from(v);
    }
    if let Some(v) = var("OUTPUT_DIR") {
        config.output_dir = PathBuf::from(v);
    }
    if let Some(v) = var("BUFFER_RADIUS_M") {
        config.buffer_radius_m = parse_env("BUFFER_RADIUS_M", &v)?;
    }
    if let Some(v) = var("QGIS_RADIUS_M") {
        config.qgis_radius_m = match v.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => None,
            _ => Some(parse_env("QGIS_RADIUS_M", &v)?),
        };
    }
    if let Some(v) = var("SEGMENTS") {
        config.segments = parse_env("SEGMENTS", &v)?;
    }
    if let Some(v) = var("PARTIAL_OVERLAP_WARNING") {
        config.partial_overlap_warning = parse_env("PARTIAL_OVERLAP_WARNING", &v)?;
    }
    if let Some(v) = var("INCLUDE") {
        config.include = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if let Some(v) = var("BUFFER_FORMAT") {
        config.buffer_format = v
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Invalid value for {}BUFFER_FORMAT: {}", ENV_PREFIX, e))?;
    }
    Ok(())
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}{}: '{}'", ENV_PREFIX, name, value))
}

pub fn apply_cli(config: &mut ClipConfig, cli: &CliOverrides) {
    if let Some(v) = &cli.site_file {
        config.site_file = v.clone();
    }
    if let Some(v) = &cli.raster {
        config.raster = v.clone();
    }
    if let Some(v) = &cli.boundary_dir {
        config.boundary_dir = v.clone();
    }
    if let Some(v) = &cli.output_dir {
        config.output_dir = v.clone();
    }
    if let Some(v) = cli.radius {
        config.buffer_radius_m = v;
    }
    if let Some(v) = cli.qgis_radius {
        config.qgis_radius_m = Some(v);
    }
    if cli.no_qgis {
        config.qgis_radius_m = None;
    }
    if let Some(v) = cli.segments {
        config.segments = v;
    }
    if !cli.include.is_empty() {
        config.include = cli.include.clone();
    }
    if let Some(v) = cli.buffer_format {
        config.buffer_format = v;
    }
}

/// Expand `${VAR}` and `${VAR:-default}` in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{}", after))?;
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = default_config();
        assert_eq!(config.buffer_radius_m, 200.0);
        assert_eq!(config.qgis_radius_m, Some(100.0));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.buffer_format, LayerFormat::Shapefile);
    }

    #[test]
    fn test_buffer_format_layers() {
        let mut config = default_config();

        let file: FileConfig = serde_yaml::from_str("buffer_format: geojson
").unwrap();
        apply_file(&mut config, file);
        assert_eq!(config.buffer_format, LayerFormat::GeoJson);

        apply_env(&mut config, env(&[("SITE_CLIP_BUFFER_FORMAT", "shp")])).unwrap();
        assert_eq!(config.buffer_format, LayerFormat::Shapefile);

        let err = apply_env(&mut config, env(&[("SITE_CLIP_BUFFER_FORMAT", "kml")])).unwrap_err();
        assert!(err.to_string().contains("SITE_CLIP_BUFFER_FORMAT"));

        let cli = CliOverrides {
            buffer_format: Some(LayerFormat::GeoJson),
            ..Default::default()
        };
        apply_cli(&mut config, &cli);
        assert_eq!(config.buffer_format, LayerFormat::GeoJson);
        assert!(config.runs().iter().all(|r| r.buffer_format == LayerFormat::GeoJson));
    }

    #[test]
    fn test_layer_precedence() {
        let mut config = default_config();

        let file: FileConfig = serde_yaml::from_str("raster: from_file.tif\nbuffer_radius_m: 150\n").unwrap();
        apply_file(&mut config, file);
        assert_eq!(config.raster, PathBuf::from("from_file.tif"));
        assert_eq!(config.buffer_radius_m, 150.0);

        apply_env(
            &mut config,
            env(&[("SITE_CLIP_RASTER", "from_env.tif"), ("SITE_CLIP_INCLUDE", "a, b")]),
        )
        .unwrap();
        assert_eq!(config.raster, PathBuf::from("from_env.tif"));
        assert_eq!(config.include, vec!["a", "b"]);

        let cli = CliOverrides {
            raster: Some(PathBuf::from("from_cli.tif")),
            no_qgis: true,
            ..Default::default()
        };
        apply_cli(&mut config, &cli);
        assert_eq!(config.raster, PathBuf::from("from_cli.tif"));
        assert_eq!(config.qgis_radius_m, None);
        assert_eq!(config.buffer_radius_m, 150.0);
    }

    #[test]
    fn test_env_disables_qgis_and_rejects_garbage() {
        let mut config = default_config();
        apply_env(&mut config, env(&[("SITE_CLIP_QGIS_RADIUS_M", "off")])).unwrap();
        assert_eq!(config.qgis_radius_m, None);

        let err = apply_env(&mut config, env(&[("SITE_CLIP_SEGMENTS", "many")])).unwrap_err();
        assert!(err.to_string().contains("SITE_CLIP_SEGMENTS"));
    }

    #[test]
    fn test_unknown_yaml_field_rejected() {
        assert!(serde_yaml::from_str::<FileConfig>("radius: 10\n").is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("SITE_CLIP_TEST_ROOT", "/data");
        std::env::remove_var("SITE_CLIP_TEST_UNSET");
        let expanded = expand_env_vars("raster: ${SITE_CLIP_TEST_ROOT}/dem.tif\nout: ${SITE_CLIP_TEST_UNSET:-output}\n").unwrap();
        assert_eq!(expanded, "raster: /data/dem.tif\nout: output\n");

        assert!(expand_env_vars("${SITE_CLIP_TEST_UNSET}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }
}
