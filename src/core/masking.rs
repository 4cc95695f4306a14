use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::core::kernels::apply_mask;
use crate::types::{Mask, Scene};

/// Sentinel-2 scene classification (SCL) codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SceneClass {
    NoData = 0,
    Saturated = 1,
    Dark = 2,
    CloudShadow = 3,
    Vegetation = 4,
    NotVegetated = 5,
    Water = 6,
    Unclassified = 7,
    CloudMediumProbability = 8,
    CloudHighProbability = 9,
    Cirrus = 10,
    SnowIce = 11,
}

impl SceneClass {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<SceneClass> {
        use SceneClass::*;
        let class = match code {
            0 => NoData,
            1 => Saturated,
            2 => Dark,
            3 => CloudShadow,
            4 => Vegetation,
            5 => NotVegetated,
            6 => Water,
            7 => Unclassified,
            8 => CloudMediumProbability,
            9 => CloudHighProbability,
            10 => Cirrus,
            11 => SnowIce,
            _ => return None,
        };
        Some(class)
    }
}

/// Probability-based cloud/snow masking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityMaskParams {
    /// Pixels need cloud probability strictly below this (percent)
    pub max_cloud_probability: f32,
    /// Pixels need snow probability strictly below this (percent)
    pub max_snow_probability: f32,
    /// SCL code rejected as cloud shadow
    pub shadow_code: u8,
    /// SCL code rejected as cirrus
    pub cirrus_code: u8,
}

impl Default for ProbabilityMaskParams {
    fn default() -> Self {
        Self {
            max_cloud_probability: 5.0,
            max_snow_probability: 5.0,
            shadow_code: SceneClass::CloudShadow.code(),
            cirrus_code: SceneClass::Cirrus.code(),
        }
    }
}

/// Classification-based masking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMaskParams {
    /// SCL codes treated as unusable
    pub unwanted_codes: Vec<u8>,
}

impl Default for ClassificationMaskParams {
    fn default() -> Self {
        Self {
            unwanted_codes: vec![
                SceneClass::CloudShadow.code(),
                SceneClass::CloudMediumProbability.code(),
                SceneClass::CloudHighProbability.code(),
                SceneClass::Cirrus.code(),
                SceneClass::SnowIce.code(),
            ],
        }
    }
}

/// Interchangeable masking strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MaskingStrategy {
    /// Cloud/snow probability bands plus SCL shadow and cirrus codes
    Probability(ProbabilityMaskParams),
    /// SCL codes only
    Classification(ClassificationMaskParams),
}

impl Default for MaskingStrategy {
    fn default() -> Self {
        MaskingStrategy::Classification(ClassificationMaskParams::default())
    }
}

/// Masking statistics for one scene
#[derive(Debug, Clone, Default)]
pub struct MaskStats {
    pub total_pixels: usize,
    pub usable_pixels: usize,
    pub usable_percentage: f64,
}

/// Decides per pixel whether a scene observation is usable
#[derive(Debug, Clone, Default)]
pub struct MaskingPolicy {
    strategy: MaskingStrategy,
}

impl MaskingPolicy {
    pub fn new(strategy: MaskingStrategy) -> Self {
        Self { strategy }
    }

    pub fn probability() -> Self {
        Self::new(MaskingStrategy::Probability(ProbabilityMaskParams::default()))
    }

    pub fn classification() -> Self {
        Self::new(MaskingStrategy::Classification(ClassificationMaskParams::default()))
    }

    pub fn strategy(&self) -> &MaskingStrategy {
        &self.strategy
    }

    /// Per-pixel usability verdict.
    ///
    /// Total: a scene lacking an auxiliary band the strategy needs is
    /// entirely unusable.
    pub fn usable_mask(&self, scene: &Scene) -> Mask {
        let dim = scene.geometry().dim();
        let aux = &scene.auxiliary;

        match &self.strategy {
            MaskingStrategy::Probability(params) => {
                let (cloud, snow, scl) = match (
                    aux.cloud_probability.as_ref(),
                    aux.snow_probability.as_ref(),
                    aux.scene_classification.as_ref(),
                ) {
                    (Some(c), Some(s), Some(scl)) => (c, s, scl),
                    _ => {
                        log::warn!("Scene {} lacks MSK_CLDPRB/MSK_SNWPRB/SCL; masking every pixel", scene.id);
                        return Array2::from_elem(dim, false);
                    }
                };
                Zip::from(cloud).and(snow).and(scl).map_collect(|&c, &s, &code| {
                    c < params.max_cloud_probability
                        && s < params.max_snow_probability
                        && code != params.shadow_code
                        && code != params.cirrus_code
                })
            }
            MaskingStrategy::Classification(params) => match aux.scene_classification.as_ref() {
                Some(scl) => scl.mapv(|code| !params.unwanted_codes.contains(&code)),
                None => {
                    log::warn!("Scene {} lacks SCL; masking every pixel", scene.id);
                    Array2::from_elem(dim, false)
                }
            },
        }
    }

    /// Return a new scene whose pixel bands are no-data wherever the pixel is unusable.
    ///
    /// Auxiliary bands and metadata are carried over untouched, so masking
    /// twice gives the same result as masking once.
    pub fn mask(&self, scene: &Scene) -> Scene {
        let usable = self.usable_mask(scene);
        let stats = Self::stats(&usable);
        log::debug!("Scene {}: {}/{} usable pixels ({:.1}%)",
                    scene.id, stats.usable_pixels, stats.total_pixels, stats.usable_percentage);

        let raster = scene
            .raster
            .map_bands(|_| true, |grid| apply_mask(&grid.view(), &usable.view()));
        scene.with_raster(raster)
    }

    pub fn stats(usable: &Mask) -> MaskStats {
        let total_pixels = usable.len();
        let usable_pixels = usable.iter().filter(|&&u| u).count();
        let usable_percentage = if total_pixels > 0 {
            usable_pixels as f64 / total_pixels as f64 * 100.0
        } else {
            0.0
        };
        MaskStats {
            total_pixels,
            usable_pixels,
            usable_percentage,
        }
    }
}
