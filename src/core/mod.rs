//! Core seasonal change processing modules

pub mod kernels;
pub mod band_select;
pub mod masking;
pub mod scaling;
pub mod indices;
pub mod composite;
pub mod difference;
pub mod stack;
pub mod cluster_labels;
pub mod visualization;
pub mod terrain;
pub mod pipeline;

// Re-export main types
pub use band_select::{BandPattern, BandSelector, SENTINEL2_BANDS, known_band_vocabulary};
pub use masking::{MaskingPolicy, MaskingStrategy, ProbabilityMaskParams, ClassificationMaskParams, SceneClass, MaskStats};
pub use scaling::{Scaler, ScalingParams};
pub use indices::{IndexEngine, SpectralIndex, normalized_difference, safe_ratio};
pub use composite::{Composite, SeasonalAggregator, median_of, median_reduce};
pub use difference::{DifferenceEngine, DifferenceParams};
pub use stack::{FeatureStack, Stacker};
pub use cluster_labels::{ClassLegendEntry, ClusterLabelMapper, ClusterLegendConfig, Color, LabelDisplay};
pub use visualization::{VisParams, nominal_range, difference_legend, cluster_legend};
pub use terrain::{TerrainProcessor, TerrainParams};
pub use pipeline::{SeasonalPipeline, PipelineConfig, PipelineOutput, SeasonReport, SeasonWindow};
