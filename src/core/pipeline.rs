use chrono::{DateTime, NaiveDate, Utc};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::band_select::BandSelector;
use crate::core::cluster_labels::{ClusterLabelMapper, ClusterLegendConfig};
use crate::core::composite::{Composite, SeasonalAggregator};
use crate::core::difference::{DifferenceEngine, DifferenceParams};
use crate::core::indices::{IndexEngine, SpectralIndex};
use crate::core::masking::{MaskingPolicy, MaskingStrategy};
use crate::core::scaling::{Scaler, ScalingParams};
use crate::core::stack::{FeatureStack, Stacker};
use crate::io::scene_source::{SceneQuery, SceneSource};
use crate::types::{ChangeError, ChangeResult, GridGeometry, Raster, Scene};

/// A named acquisition window, `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub name: String,
    /// Appended to every composite band name, e.g. `_sum`
    pub suffix: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonWindow {
    pub fn new(name: impl Into<String>, suffix: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.into(),
            suffix: suffix.into(),
            start,
            end,
        }
    }

    /// Southern-hemisphere summer 2022
    pub fn summer() -> Self {
        Self::from_ymd("summer", "_sum", (2022, 1, 1), (2022, 3, 31))
    }

    /// Southern-hemisphere winter 2021
    pub fn winter() -> Self {
        Self::from_ymd("winter", "_win", (2021, 7, 1), (2021, 9, 30))
    }

    fn from_ymd(name: &str, suffix: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> Self {
        // constant dates, always valid
        let date = |(y, m, d): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        Self::new(name, suffix, date(start), date(end))
    }

    pub fn contains(&self, acquired: &DateTime<Utc>) -> bool {
        let date = acquired.date_naive();
        date >= self.start && date < self.end
    }

    fn validate(&self) -> ChangeResult<()> {
        if self.start >= self.end {
            return Err(ChangeError::Configuration(format!(
                "season {} window {} .. {} is empty", self.name, self.start, self.end
            )));
        }
        if self.suffix.is_empty() {
            return Err(ChangeError::Configuration(format!("season {} has an empty suffix", self.name)));
        }
        Ok(())
    }
}

/// Configuration for the whole seasonal change run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub masking: MaskingStrategy,
    pub scaling: ScalingParams,
    /// Index bands appended to every scene
    pub indices: Vec<SpectralIndex>,
    /// Minuend season of the differences
    pub primary_season: SeasonWindow,
    /// Subtrahend season of the differences
    pub reference_season: SeasonWindow,
    /// Full-match patterns selecting the composite bands
    pub band_patterns: Vec<String>,
    /// Composite bands to difference, in output order
    pub difference_bands: Vec<String>,
    pub difference: DifferenceParams,
    /// Optional reducer tag inserted before the season suffix, e.g. `_median`
    pub reducer_suffix: Option<String>,
    /// Scene-level cloud cover ceiling used when querying a source
    pub max_cloud_percentage: f32,
    pub legend: ClusterLegendConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            masking: MaskingStrategy::default(),
            scaling: ScalingParams::default(),
            indices: SpectralIndex::ALL.to_vec(),
            primary_season: SeasonWindow::summer(),
            reference_season: SeasonWindow::winter(),
            band_patterns: vec!["B[2-4,8]".to_string(), "NDVI".to_string(), "NDWI".to_string()],
            difference_bands: vec!["NDVI".to_string(), "NDWI".to_string()],
            difference: DifferenceParams::default(),
            reducer_suffix: None,
            max_cloud_percentage: 30.0,
            legend: ClusterLegendConfig::default(),
        }
    }
}

/// Per-season bookkeeping so callers can detect a degenerate run
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonReport {
    pub season: String,
    /// Scenes acquired inside the window
    pub scene_count: usize,
    /// Scenes with at least one usable pixel after masking
    pub usable_scene_count: usize,
    pub degenerate: bool,
    /// Fraction of pixels with no valid observation
    pub empty_fraction: f64,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub feature_stack: FeatureStack,
    /// Primary-season composite, bands suffixed
    pub summer: Composite,
    /// Reference-season composite, bands suffixed
    pub winter: Composite,
    /// Difference rasters in configured order
    pub differences: Vec<Raster>,
    pub reports: Vec<SeasonReport>,
}

impl PipelineOutput {
    /// True when either season produced an all no-data composite
    pub fn is_degenerate(&self) -> bool {
        self.reports.iter().any(|r| r.degenerate)
    }
}

/// Mask, scale, index, composite, difference and stack in one pass
#[derive(Debug, Clone)]
pub struct SeasonalPipeline {
    config: PipelineConfig,
    geometry: GridGeometry,
    masking: MaskingPolicy,
    scaler: Scaler,
    indices: IndexEngine,
    selector: BandSelector,
    differences: DifferenceEngine,
    labels: ClusterLabelMapper,
}

impl SeasonalPipeline {
    /// Build a pipeline on the target grid, validating the whole configuration up front
    pub fn new(config: PipelineConfig, geometry: GridGeometry) -> ChangeResult<Self> {
        config.primary_season.validate()?;
        config.reference_season.validate()?;
        if config.primary_season.suffix == config.reference_season.suffix {
            return Err(ChangeError::DuplicateBand(format!(
                "both seasons use suffix {}", config.primary_season.suffix
            )));
        }

        let scaler = Scaler::new(config.scaling.clone())?;
        let selector = BandSelector::new(&config.band_patterns)?;
        let selected = selector.resolve_known()?;
        for band in &selected {
            if let Some(index) = SpectralIndex::from_name(band) {
                if !config.indices.contains(&index) {
                    return Err(ChangeError::MissingBand(format!(
                        "composite band {} is an index the pipeline does not compute (indices {:?})",
                        band, config.indices
                    )));
                }
            }
        }
        for band in &config.difference_bands {
            if !selected.contains(band) {
                return Err(ChangeError::MissingBand(format!(
                    "difference band {} is not among the composite bands {:?}", band, selected
                )));
            }
        }
        let labels = ClusterLabelMapper::new(config.legend.clone())?;

        log::info!("Seasonal pipeline: {} ({}) minus {} ({}), bands {:?}, differences {:?}",
                   config.primary_season.name, config.primary_season.suffix,
                   config.reference_season.name, config.reference_season.suffix,
                   selected, config.difference_bands);

        Ok(Self {
            masking: MaskingPolicy::new(config.masking.clone()),
            scaler,
            indices: IndexEngine::new(config.indices.clone()),
            selector,
            differences: DifferenceEngine::new(config.difference.clone()),
            labels,
            geometry,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Legend and palette lookup for the labels a clustering backend returns
    pub fn label_mapper(&self) -> &ClusterLabelMapper {
        &self.labels
    }

    /// Mask, then scale, then append spectral indices
    pub fn prepare_scene(&self, scene: &Scene) -> ChangeResult<Scene> {
        let masked = self.masking.mask(scene);
        let scaled = self.scaler.scale(&masked);
        self.indices.compute_indices(&scaled)
    }

    /// Run over raw scenes; scenes outside both windows are ignored
    pub fn run(&self, scenes: &[Scene]) -> ChangeResult<PipelineOutput> {
        let primary_window = &self.config.primary_season;
        let reference_window = &self.config.reference_season;

        let in_season: Vec<&Scene> = scenes
            .iter()
            .filter(|scene| {
                let keep = primary_window.contains(&scene.metadata.acquired)
                    || reference_window.contains(&scene.metadata.acquired);
                if !keep {
                    log::debug!("Scene {} acquired {} is outside both seasons", scene.id, scene.metadata.acquired);
                }
                keep
            })
            .collect();

        #[cfg(feature = "parallel")]
        let prepared = in_season
            .par_iter()
            .map(|scene| self.prepare_scene(scene))
            .collect::<ChangeResult<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let prepared = in_season
            .iter()
            .map(|scene| self.prepare_scene(scene))
            .collect::<ChangeResult<Vec<_>>>()?;

        let mut primary_scenes = Vec::new();
        let mut reference_scenes = Vec::new();
        for prepared in prepared {
            let in_primary = primary_window.contains(&prepared.metadata.acquired);
            let in_reference = reference_window.contains(&prepared.metadata.acquired);
            if in_primary && in_reference {
                reference_scenes.push(prepared.clone());
                primary_scenes.push(prepared);
            } else if in_primary {
                primary_scenes.push(prepared);
            } else {
                reference_scenes.push(prepared);
            }
        }
        log::info!("Season split: {} {} scenes, {} {} scenes",
                   primary_scenes.len(), primary_window.name,
                   reference_scenes.len(), reference_window.name);

        let usable = [usable_scene_count(&primary_scenes), usable_scene_count(&reference_scenes)];

        let aggregator = SeasonalAggregator::new(self.selector.clone(), self.geometry);
        let primary = aggregator.aggregate(&primary_scenes)?;
        let reference = aggregator.aggregate(&reference_scenes)?;

        let differences = self
            .config
            .difference_bands
            .iter()
            .map(|band| self.differences.difference(&primary.raster, &reference.raster, band))
            .collect::<ChangeResult<Vec<_>>>()?;

        let primary = self.finish_composite(primary, primary_window);
        let reference = self.finish_composite(reference, reference_window);

        let reports = vec![
            Self::report(primary_window, &primary, usable[0]),
            Self::report(reference_window, &reference, usable[1]),
        ];
        for report in reports.iter().filter(|r| r.degenerate) {
            log::warn!("Season {} is degenerate: {} scenes, {} usable, no valid pixels",
                       report.season, report.scene_count, report.usable_scene_count);
        }

        let mut parts: Vec<&Raster> = vec![&primary.raster, &reference.raster];
        parts.extend(differences.iter());
        let feature_stack = Stacker::new().stack(&parts)?;

        Ok(PipelineOutput {
            feature_stack,
            summer: primary,
            winter: reference,
            differences,
            reports,
        })
    }

    /// Query `source` once per season over `area` and run on the union
    pub fn run_from_source(&self, source: &dyn SceneSource) -> ChangeResult<PipelineOutput> {
        let area = self.geometry.bounding_box();
        let mut scenes = Vec::new();
        for window in [&self.config.primary_season, &self.config.reference_season] {
            let query = SceneQuery {
                area,
                start: window.start,
                end: window.end,
                max_cloud_percentage: self.config.max_cloud_percentage,
            };
            let fetched = source.fetch(&query)?;
            log::info!("Season {}: {} scenes from source", window.name, fetched.len());
            for scene in fetched {
                if !scenes.iter().any(|s: &Scene| s.id == scene.id) {
                    scenes.push(scene);
                }
            }
        }
        self.run(&scenes)
    }

    fn finish_composite(&self, composite: Composite, window: &SeasonWindow) -> Composite {
        let composite = match &self.config.reducer_suffix {
            Some(reducer) => composite.with_reducer_suffix(reducer),
            None => composite,
        };
        Composite {
            raster: composite.raster.with_suffix(&window.suffix),
            ..composite
        }
    }

    fn report(window: &SeasonWindow, composite: &Composite, usable_scene_count: usize) -> SeasonReport {
        SeasonReport {
            season: window.name.clone(),
            scene_count: composite.scene_count,
            usable_scene_count,
            degenerate: composite.is_degenerate(),
            empty_fraction: composite.empty_fraction(),
        }
    }
}

/// Scenes that kept at least one valid pixel in any band
fn usable_scene_count(scenes: &[Scene]) -> usize {
    scenes
        .iter()
        .filter(|scene| scene.raster.valid_counts().iter().any(|(_, count)| *count > 0))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoordinateSystem, GeoTransform};
    use chrono::TimeZone;

    fn geometry() -> GridGeometry {
        GridGeometry::new(2, 2, GeoTransform::north_up(-68.6, -31.5, 0.0001), CoordinateSystem::Geographic)
    }

    #[test]
    fn test_season_window_end_is_exclusive() {
        let summer = SeasonWindow::summer();
        assert!(summer.contains(&Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()));
        assert!(summer.contains(&Utc.with_ymd_and_hms(2022, 3, 30, 23, 59, 59).unwrap()));
        assert!(!summer.contains(&Utc.with_ymd_and_hms(2022, 3, 31, 0, 0, 0).unwrap()));
        assert!(!summer.contains(&Utc.with_ymd_and_hms(2021, 8, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_configuration_is_checked_up_front() {
        let mut config = PipelineConfig::default();
        config.reference_season.suffix = "_sum".to_string();
        assert!(matches!(SeasonalPipeline::new(config, geometry()), Err(ChangeError::DuplicateBand(_))));

        let mut config = PipelineConfig::default();
        config.difference_bands = vec!["EVI".to_string()];
        assert!(matches!(SeasonalPipeline::new(config, geometry()), Err(ChangeError::MissingBand(_))));

        let mut config = PipelineConfig::default();
        config.band_patterns = vec!["B9[".to_string()];
        assert!(matches!(SeasonalPipeline::new(config, geometry()), Err(ChangeError::InvalidPattern { .. })));

        let mut config = PipelineConfig::default();
        config.legend.palette.pop();
        assert!(SeasonalPipeline::new(config, geometry()).unwrap_err().is_configuration_error());

        let mut config = PipelineConfig::default();
        config.indices = vec![SpectralIndex::Ndwi];
        let err = SeasonalPipeline::new(config, geometry()).unwrap_err();
        assert!(matches!(&err, ChangeError::MissingBand(msg) if msg.contains("NDVI")));
        assert!(err.is_configuration_error());

        let mut config = PipelineConfig::default();
        config.indices = vec![SpectralIndex::Ndwi, SpectralIndex::Ndvi];
        assert!(SeasonalPipeline::new(config, geometry()).is_ok());

        let mut config = PipelineConfig::default();
        config.primary_season.end = config.primary_season.start;
        assert!(SeasonalPipeline::new(config, geometry()).is_err());
    }

    #[test]
    fn test_no_scenes_gives_degenerate_but_complete_output() {
        let pipeline = SeasonalPipeline::new(PipelineConfig::default(), geometry()).unwrap();
        let output = pipeline.run(&[]).unwrap();
        assert!(output.is_degenerate());
        assert_eq!(output.reports[0].scene_count, 0);
        assert_eq!(output.reports[0].usable_scene_count, 0);
        assert_eq!(output.feature_stack.band_count(), 6 + 6 + 2);
        assert_eq!(output.feature_stack.complete_pixel_count(), 0);
    }
}
