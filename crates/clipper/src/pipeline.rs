//! Pipeline entry points.

use std::time::Instant;

use clip_common::{read_site_coordinate, ClipError, ClipResult, SiteCoordinate};
use geotiff::{read_raster, RasterLayer};
use tracing::{info, instrument};
use vector_layer::{list_layers, read_layer, VectorLayer};

use crate::buffer::build_buffer;
use crate::config::{ClipConfig, RunSpec};
use crate::output::OutputLayout;
use crate::raster_clip::clip_raster;
use crate::summary::RunSummary;
use crate::vector_clip::clip_layer;

/// Inputs read once and shared by every run.
#[derive(Debug, Clone)]
pub struct SiteInputs {
    pub site: SiteCoordinate,
    pub raster: RasterLayer,
    pub layers: Vec<VectorLayer>,
}

/// Read the site, the DEM and every boundary layer named by `config`.
///
/// The DEM must carry a CRS; so must every layer.
pub fn load_inputs(config: &ClipConfig) -> ClipResult<SiteInputs> {
    let site = read_site_coordinate(&config.site_file)?;
    info!(site = %site, path = %config.site_file.display(), "Read site coordinate");

    let raster = read_raster(&config.raster)?;
    if raster.crs().is_none() {
        return Err(ClipError::MissingCrs(format!("raster {}", config.raster.display())));
    }
    info!(
        path = %config.raster.display(),
        width = raster.width(),
        height = raster.height(),
        sample_format = raster.sample_format().name(),
        "Read elevation raster"
    );

    let layers = list_layers(&config.boundary_dir, &config.include)?
        .iter()
        .map(read_layer)
        .collect::<Result<Vec<_>, _>>()?;
    info!(dir = %config.boundary_dir.display(), layers = layers.len(), "Read boundary layers");

    Ok(SiteInputs { site, raster, layers })
}

/// Buffer, clip and write everything for one run.
#[instrument(skip_all, fields(run = %run.label, radius_m = run.radius_m))]
pub fn run_clip(inputs: &SiteInputs, run: &RunSpec, config: &ClipConfig) -> ClipResult<RunSummary> {
    let crs = inputs
        .raster
        .crs()
        .ok_or_else(|| ClipError::MissingCrs("elevation raster".to_string()))?;

    let buffer = build_buffer(&inputs.site, crs, run.radius_m, config.segments)?;

    // Nothing is written until the raster overlap is known to be usable
    let clip = clip_raster(&inputs.raster, &buffer.polygon, config.partial_overlap_warning)?;

    let layout = OutputLayout::for_run(run);
    layout.ensure_dir()?;

    let buffer_output = layout.write_buffer(&buffer)?;
    let dem = layout.write_dem(&clip.raster, clip.retained_pixels)?;
    info!(
        path = %dem.path.display(),
        pixels = clip.retained_pixels,
        width = clip.raster.width(),
        height = clip.raster.height(),
        "Wrote clipped DEM"
    );

    let mut layers = Vec::with_capacity(inputs.layers.len());
    for layer in &inputs.layers {
        let clipped = clip_layer(layer, &buffer, &layout.layer_name(&layer.name))?;
        let output = layout.write_layer(&clipped)?;
        info!(layer = %layer.name, features = output.count, path = %output.path.display(), "Clipped layer");
        layers.push(output);
    }

    Ok(RunSummary {
        label: run.label.clone(),
        radius_m: run.radius_m,
        suffix: layout.suffix().to_string(),
        output_dir: layout.dir().to_path_buf(),
        crs: crs.identifier(),
        buffer: buffer_output,
        dem,
        raster_coverage: clip.coverage,
        layers,
    })
}

/// Run every configured buffer, primary first.
pub fn run_pipeline(config: &ClipConfig) -> ClipResult<Vec<RunSummary>> {
    let start = Instant::now();
    config.validate()?;

    let inputs = load_inputs(config)?;
    let summaries = config
        .runs()
        .iter()
        .map(|run| run_clip(&inputs, run, config))
        .collect::<ClipResult<Vec<_>>>()?;

    info!(
        runs = summaries.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Pipeline complete"
    );
    Ok(summaries)
}
