//! HEC-RAS RAS Mapper import package.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clip_common::{ClipError, Crs};
use clipper::RunSummary;
use tracing::info;

pub const TERRAIN_FILE: &str = "terrain.tif";
pub const PROJECTION_FILE: &str = "projection.prj";
/// Buffer file stem; the extension follows the run's buffer format.
pub const BUFFER_STEM: &str = "site_buffer";
pub const README_FILE: &str = "README_HECRAS.txt";

/// Return periods listed in the import instructions, in years.
const RETURN_PERIODS: [u32; 7] = [1, 2, 5, 10, 25, 100, 200];

/// Files written into the package directory.
#[derive(Debug, Clone)]
pub struct HecrasPackage {
    pub dir: PathBuf,
    pub terrain: PathBuf,
    pub projection: PathBuf,
    pub buffer: PathBuf,
    /// Buffer file plus its sidecars (.shx, .dbf, .prj, .cpg)
    pub buffer_parts: Vec<PathBuf>,
    pub readme: PathBuf,
}

impl HecrasPackage {
    pub fn files(&self) -> Vec<&Path> {
        let mut files = vec![self.terrain.as_path(), self.projection.as_path()];
        files.extend(self.buffer_parts.iter().map(PathBuf::as_path));
        files.push(&self.readme);
        files
    }
}

/// Copy the clipped terrain and buffer of `run` into `out_dir` and write
/// the projection file and import instructions next to them.
pub fn export_hecras(run: &RunSummary, out_dir: &Path) -> Result<HecrasPackage> {
    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let terrain = out_dir.join(TERRAIN_FILE);
    fs::copy(&run.dem.path, &terrain)
        .with_context(|| format!("Failed to copy {} to {}", run.dem.path.display(), terrain.display()))?;

    let raster = geotiff::read_raster(&terrain)?;
    let crs = raster
        .crs()
        .ok_or_else(|| ClipError::MissingCrs(format!("raster {}", terrain.display())))?;

    let projection = out_dir.join(PROJECTION_FILE);
    fs::write(&projection, projection_text(crs))
        .with_context(|| format!("Failed to write {}", projection.display()))?;

    let buffer_parts = copy_layer_files(&run.buffer.path, out_dir, BUFFER_STEM)?;
    let buffer = buffer_file_name(&run.buffer.path);
    let buffer = out_dir.join(&buffer);

    let readme = out_dir.join(README_FILE);
    fs::write(&readme, readme_text(run.radius_m, crs, &buffer_file_name(&run.buffer.path)))
        .with_context(|| format!("Failed to write {}", readme.display()))?;

    info!(dir = %out_dir.display(), radius_m = run.radius_m, crs = %crs, "Wrote HEC-RAS package");

    Ok(HecrasPackage {
        dir: out_dir.to_path_buf(),
        terrain,
        projection,
        buffer,
        buffer_parts,
        readme,
    })
}

fn buffer_file_name(source: &Path) -> String {
    match source.extension() {
        Some(ext) => format!("{}.{}", BUFFER_STEM, ext.to_string_lossy()),
        None => BUFFER_STEM.to_string(),
    }
}

/// Copy a layer and every sidecar file next to it into `out_dir`, renamed
/// to `stem` with the original extensions.
fn copy_layer_files(source: &Path, out_dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for part in vector_layer::layer_files(source) {
        let target = match part.extension() {
            Some(ext) => out_dir.join(format!("{}.{}", stem, ext.to_string_lossy())),
            None => out_dir.join(stem),
        };
        fs::copy(&part, &target)
            .with_context(|| format!("Failed to copy {} to {}", part.display(), target.display()))?;
        copied.push(target);
    }
    Ok(copied)
}

/// WKT of the CRS when the EPSG table knows it, otherwise its PROJ string.
pub fn projection_text(crs: &Crs) -> String {
    match crs.definition_wkt() {
        Some(wkt) => wkt.trim().to_string(),
        None => crs.proj().to_string(),
    }
}

fn readme_text(radius_m: f64, crs: &Crs, buffer: &str) -> String {
    let periods: Vec<String> = RETURN_PERIODS.iter().map(|p| p.to_string()).collect();

    format!(
        "HEC-RAS 2D Terrain Package\n\
         {rule}\n\n\
         Generated: {generated}\n\
         Buffer: {radius_m} m radius\n\
         CRS: {crs}\n\n\
         Files:\n\
         \x20 {terrain:<20} - Clipped DEM (import as terrain in RAS Mapper)\n\
         \x20 {prj:<20} - Projection file for RAS Mapper\n\
         \x20 {buffer:<20} - Study area boundary (reference layer)\n\n\
         Import into HEC-RAS:\n\
         \x20 1. Open RAS Mapper\n\
         \x20 2. Project > Set Projection > browse to {prj}\n\
         \x20 3. Project > New Terrain > select {terrain}\n\
         \x20 4. (Optional) Add {buffer} as a reference layer\n\
         \x20 5. Create a 2D Flow Area covering the study area\n\
         \x20 6. Set boundary conditions for flood return periods\n\
         \x20    ({periods}-year events)\n",
        rule = "=".repeat(40),
        generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        radius_m = radius_m,
        crs = crs.identifier(),
        terrain = TERRAIN_FILE,
        prj = PROJECTION_FILE,
        buffer = buffer,
        periods = periods.join(", "),
    )
}
