use serde::{Deserialize, Serialize};

use crate::core::kernels::zip_pixels;
use crate::types::{ChangeResult, Raster};

/// Naming for seasonal difference bands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferenceParams {
    /// Prefix of the output band name, `Dif_` gives `Dif_NDVI`
    pub prefix: String,
}

impl Default for DifferenceParams {
    fn default() -> Self {
        Self {
            prefix: "Dif_".to_string(),
        }
    }
}

/// Per-pixel seasonal deltas
#[derive(Debug, Clone, Default)]
pub struct DifferenceEngine {
    params: DifferenceParams,
}

impl DifferenceEngine {
    pub fn new(params: DifferenceParams) -> Self {
        Self { params }
    }

    pub fn output_name(&self, band: &str) -> String {
        format!("{}{}", self.params.prefix, band)
    }

    /// `a[band] - b[band]` as a single-band raster named `<prefix><band>`.
    ///
    /// No-data on either side gives no-data. Both rasters must share a
    /// geometry and contain `band`.
    pub fn difference(&self, a: &Raster, b: &Raster, band: &str) -> ChangeResult<Raster> {
        a.geometry().ensure_matches(b.geometry(), &format!("difference of {}", band))?;
        let minuend = a.require(band)?;
        let subtrahend = b.require(band)?;

        log::debug!("Differencing band {}", band);
        let delta = zip_pixels(&minuend.data.view(), &subtrahend.data.view(), |x, y| x - y);

        Raster::new(*a.geometry()).with_band(self.output_name(band), delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeError, CoordinateSystem, GeoTransform, GridGeometry};
    use ndarray::array;

    fn raster(values: ndarray::Array2<f32>) -> Raster {
        let geometry = GridGeometry::new(1, 3, GeoTransform::north_up(0.0, 0.0, 10.0), CoordinateSystem::Geographic);
        Raster::new(geometry).with_band("NDVI", values).unwrap()
    }

    #[test]
    fn test_difference_and_no_data() {
        let summer = raster(array![[0.7f32, f32::NAN, 0.3]]);
        let winter = raster(array![[0.2f32, 0.4, f32::NAN]]);
        let out = DifferenceEngine::default().difference(&summer, &winter, "NDVI").unwrap();
        assert_eq!(out.band_names(), vec!["Dif_NDVI"]);
        let d = &out.band("Dif_NDVI").unwrap().data;
        assert!((d[[0, 0]] - 0.5).abs() < 1e-6);
        assert!(d[[0, 1]].is_nan());
        assert!(d[[0, 2]].is_nan());
    }

    #[test]
    fn test_missing_band_is_reported() {
        let summer = raster(array![[0.7f32, 0.1, 0.3]]);
        let err = DifferenceEngine::default().difference(&summer, &summer, "NDWI").unwrap_err();
        assert!(matches!(err, ChangeError::MissingBand(name) if name == "NDWI"));
    }
}
