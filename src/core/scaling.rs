use serde::{Deserialize, Serialize};

use crate::core::band_select::BandPattern;
use crate::core::kernels::map_pixels;
use crate::types::{ChangeResult, Pixel, Scene};

/// Digital-number to reflectance scaling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingParams {
    /// Multiplicative factor (Sentinel-2 L2A: 1e-4)
    pub factor: Pixel,
    /// Full-match pattern naming the optical bands to scale; must not match index names such as BSI
    pub optical_pattern: String,
}

impl Default for ScalingParams {
    fn default() -> Self {
        Self {
            factor: 0.0001,
            optical_pattern: "B[0-9]+A?".to_string(),
        }
    }
}

/// Converts optical digital numbers to unitless surface reflectance
#[derive(Debug, Clone)]
pub struct Scaler {
    factor: Pixel,
    optical: BandPattern,
}

impl Scaler {
    pub fn new(params: ScalingParams) -> ChangeResult<Self> {
        Ok(Self {
            factor: params.factor,
            optical: BandPattern::parse(&params.optical_pattern)?,
        })
    }

    pub fn sentinel2() -> ChangeResult<Self> {
        Self::new(ScalingParams::default())
    }

    pub fn factor(&self) -> Pixel {
        self.factor
    }

    pub fn is_optical(&self, band: &str) -> bool {
        self.optical.matches(band)
    }

    /// Return a new scene with optical bands multiplied by the factor.
    ///
    /// Values above 1 are kept as they are. Non-optical bands, auxiliary
    /// bands and metadata pass through.
    pub fn scale(&self, scene: &Scene) -> Scene {
        let factor = self.factor;
        log::debug!("Scaling optical bands of scene {} by {}", scene.id, factor);
        let raster = scene
            .raster
            .map_bands(|name| self.is_optical(name), |grid| map_pixels(&grid.view(), |v| v * factor));
        scene.with_raster(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoordinateSystem, GeoTransform, Grid, GridGeometry, Raster, SceneMetadata};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use ndarray::array;

    #[test]
    fn test_scales_optical_bands_only() {
        let geometry = GridGeometry::new(1, 2, GeoTransform::north_up(0.0, 0.0, 10.0), CoordinateSystem::Geographic);
        let raster = Raster::new(geometry)
            .with_band("B8", array![[5000.0f32, 12000.0]])
            .unwrap()
            .with_band("QA60", array![[1024.0f32, f32::NAN]])
            .unwrap();
        let metadata = SceneMetadata {
            acquired: Utc.with_ymd_and_hms(2021, 8, 1, 14, 0, 0).unwrap(),
            cloudy_pixel_percentage: 3.0,
        };
        let scene = Scene::new("S2B_TEST", metadata.clone(), raster)
            .with_cloud_probability(array![[40.0f32, 2.0]])
            .unwrap();

        let scaled = Scaler::sentinel2().unwrap().scale(&scene);
        let b8 = &scaled.raster.band("B8").unwrap().data;
        assert_relative_eq!(b8[[0, 0]], 0.5, epsilon = 1e-6);
        // not clamped
        assert_relative_eq!(b8[[0, 1]], 1.2, epsilon = 1e-6);
        assert_eq!(scaled.raster.band("QA60").unwrap().data[[0, 0]], 1024.0);
        assert_eq!(scaled.auxiliary.cloud_probability.as_ref().unwrap()[[0, 0]], 40.0);
        assert_eq!(scaled.metadata, metadata);
    }

    #[test]
    fn test_no_data_survives_scaling() {
        let geometry = GridGeometry::new(1, 1, GeoTransform::north_up(0.0, 0.0, 10.0), CoordinateSystem::Geographic);
        let raster = Raster::new(geometry).with_band("B4", Grid::from_elem((1, 1), f32::NAN)).unwrap();
        let metadata = SceneMetadata {
            acquired: Utc.with_ymd_and_hms(2021, 8, 1, 14, 0, 0).unwrap(),
            cloudy_pixel_percentage: 0.0,
        };
        let scaled = Scaler::sentinel2().unwrap().scale(&Scene::new("x", metadata, raster));
        assert!(scaled.raster.band("B4").unwrap().data[[0, 0]].is_nan());
    }

    #[test]
    fn test_index_bands_are_not_rescaled() {
        use crate::core::indices::IndexEngine;

        let geometry = GridGeometry::new(1, 1, GeoTransform::north_up(0.0, 0.0, 10.0), CoordinateSystem::Geographic);
        let mut raster = Raster::new(geometry);
        for (name, dn) in [("B2", 0.04f32), ("B4", 0.1), ("B8", 0.4), ("B11", 0.2), ("B12", 0.15)] {
            raster = raster.with_band(name, Grid::from_elem((1, 1), dn)).unwrap();
        }
        let metadata = SceneMetadata {
            acquired: Utc.with_ymd_and_hms(2022, 2, 1, 14, 0, 0).unwrap(),
            cloudy_pixel_percentage: 0.0,
        };
        let indexed = IndexEngine::default()
            .compute_indices(&Scene::new("S2A_IDX", metadata, raster))
            .unwrap();

        let scaler = Scaler::sentinel2().unwrap();
        assert!(scaler.is_optical("B8A"));
        assert!(!scaler.is_optical("BSI"));
        assert!(!scaler.is_optical("BNRI"));

        let scaled = scaler.scale(&indexed);
        for name in ["BSI", "BNRI", "NDVI", "MSI"] {
            assert_eq!(
                scaled.raster.band(name).unwrap().data[[0, 0]],
                indexed.raster.band(name).unwrap().data[[0, 0]],
                "{} was rescaled",
                name
            );
        }
        assert_relative_eq!(scaled.raster.band("B8").unwrap().data[[0, 0]], 0.00004, epsilon = 1e-9);
    }

    #[test]
    fn test_bad_pattern_is_configuration_error() {
        let params = ScalingParams { optical_pattern: "B(".to_string(), ..Default::default() };
        assert!(Scaler::new(params).unwrap_err().is_configuration_error());
    }
}
