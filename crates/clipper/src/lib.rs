//! Buffer-and-clip pipeline.
//!
//! A site coordinate is buffered in the DEM's projected CRS; the buffer then
//! clips the DEM and every boundary layer, and all results are written to a
//! fixed, suffix-based output layout.
//!
//! # Example
//!
//! ```ignore
//! use clipper::{run_pipeline, ClipConfig};
//!
//! let config = ClipConfig::new("site.txt", "dem.tif", "boundaries", "output");
//! for run in run_pipeline(&config)? {
//!     println!("{}: {} pixels", run.label, run.dem.count);
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod raster_clip;
pub mod summary;
pub mod vector_clip;

pub use buffer::{build_buffer, BufferSpec, SiteBuffer, DEFAULT_SEGMENTS};
pub use config::{ClipConfig, RunSpec};
pub use output::{OutputLayout, BUFFER_LAYER_PREFIX};
pub use pipeline::{load_inputs, run_clip, run_pipeline, SiteInputs};
pub use raster_clip::{clip_raster, RasterClip};
pub use summary::{ClipOutput, OutputKind, RunSummary};
pub use vector_clip::{clip_layer, reproject_layer};
