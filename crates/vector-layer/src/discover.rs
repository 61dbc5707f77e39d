//! Boundary layer discovery.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::LayerError;
use crate::layer::layer_name;

const LAYER_EXTENSIONS: &[&str] = &["shp", "geojson", "json"];

/// List shapefile and GeoJSON layers directly inside `dir`, sorted by file name.
///
/// When `include` is non-empty only layers whose stem appears in it are
/// returned. Subdirectories are not searched.
pub fn list_layers(dir: &Path, include: &[String]) -> Result<Vec<PathBuf>, LayerError> {
    if !dir.is_dir() {
        return Err(LayerError::Directory {
            path: dir.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    let mut layers = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| LayerError::Directory {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() || !is_layer_file(path) {
            continue;
        }

        if !include.is_empty() && !include.iter().any(|name| *name == layer_name(path)) {
            debug!(path = %path.display(), "Skipping layer not in include list");
            continue;
        }

        layers.push(path.to_path_buf());
    }

    Ok(layers)
}

fn is_layer_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| LAYER_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lists_sorted_layers_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zoning.geojson", "counties.json", "notes.txt", "Roads.GeoJSON", "parcels.shp", "parcels.dbf"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/hidden.geojson"), "{}").unwrap();

        let names: Vec<String> = list_layers(dir.path(), &[])
            .unwrap()
            .iter()
            .map(|p| layer_name(p))
            .collect();
        assert_eq!(names, vec!["Roads", "counties", "parcels", "zoning"]);
    }

    #[test]
    fn test_include_filter() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.geojson", "b.geojson", "c.geojson"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let layers = list_layers(dir.path(), &["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(layers.len(), 2);
        assert!(layers[0].ends_with("a.geojson"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_layers(&dir.path().join("absent"), &[]),
            Err(LayerError::Directory { .. })
        ));
    }
}
