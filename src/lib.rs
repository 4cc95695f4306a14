//! seasonal-change: Sentinel-2 seasonal land-cover change features
//!
//! Masks and scales optical scenes, derives spectral indices, builds
//! per-season median composites, differences them and stacks everything
//! into one feature raster for unsupervised clustering. Cluster labels
//! coming back from the clustering backend are mapped to colours and
//! simplified vegetation classes.

pub mod types;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    Band, BoundingBox, ChangeError, ChangeResult, CoordinateSystem, GeoTransform, Grid,
    GridGeometry, LabelGrid, Mask, Pixel, Raster, Scene, SceneMetadata, NO_DATA,
};

pub use crate::core::{
    FeatureStack, PipelineConfig, PipelineOutput, SeasonalPipeline, SpectralIndex,
};
pub use io::{InMemorySceneSource, SceneSource};
