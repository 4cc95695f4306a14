//! Spectral indices computed from scaled Sentinel-2 reflectance.
//!
//! B2=blue, B3=green, B4=red, B5=red-edge, B8=NIR, B11=SWIR1, B12=SWIR2.
//! A pixel is no-data in an index whenever one of its input bands is no-data
//! or missing from the scene, or the formula divides by zero.

use crate::core::kernels::{evaluate_pixels, no_data_grid};
use crate::types::{Band, ChangeResult, Grid, Pixel, Scene, NO_DATA};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// The nine derived indices, in the order they are appended to a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralIndex {
    /// Normalized Difference Water Index (McFeeters)
    Ndwi,
    /// Normalized Difference Moisture Index
    Ndmi,
    /// Moisture Stress Index
    Msi,
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Enhanced Vegetation Index
    Evi,
    /// Two-band Enhanced Vegetation Index
    Evi2,
    /// Normalized Difference Red Edge 1
    Ndre1,
    /// Normalized Burn Ratio
    Bnri,
    /// Bare Soil Index
    Bsi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 9] = [
        SpectralIndex::Ndwi,
        SpectralIndex::Ndmi,
        SpectralIndex::Msi,
        SpectralIndex::Ndvi,
        SpectralIndex::Evi,
        SpectralIndex::Evi2,
        SpectralIndex::Ndre1,
        SpectralIndex::Bnri,
        SpectralIndex::Bsi,
    ];

    /// Output band name
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Ndmi => "NDMI",
            SpectralIndex::Msi => "MSI",
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Evi => "EVI",
            SpectralIndex::Evi2 => "EVI2",
            SpectralIndex::Ndre1 => "NDRE1",
            SpectralIndex::Bnri => "BNRI",
            SpectralIndex::Bsi => "BSI",
        }
    }

    pub fn from_name(name: &str) -> Option<SpectralIndex> {
        Self::ALL.iter().copied().find(|i| i.name().eq_ignore_ascii_case(name))
    }

    /// Input bands in the order `evaluate` expects them
    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            SpectralIndex::Ndwi => &["B3", "B8"],
            SpectralIndex::Ndmi => &["B8", "B11"],
            SpectralIndex::Msi => &["B11", "B8"],
            SpectralIndex::Ndvi => &["B8", "B4"],
            SpectralIndex::Evi => &["B8", "B4", "B2"],
            SpectralIndex::Evi2 => &["B8", "B4"],
            SpectralIndex::Ndre1 => &["B8", "B5"],
            SpectralIndex::Bnri => &["B8", "B12"],
            SpectralIndex::Bsi => &["B4", "B11", "B8", "B2"],
        }
    }

    /// True for the `(A - B) / (A + B)` family, bounded in [-1, 1] for positive inputs
    pub fn is_normalized_difference(&self) -> bool {
        matches!(
            self,
            SpectralIndex::Ndwi
                | SpectralIndex::Ndmi
                | SpectralIndex::Ndvi
                | SpectralIndex::Ndre1
                | SpectralIndex::Bnri
                | SpectralIndex::Bsi
        )
    }

    /// Evaluate the formula for one pixel; `v` follows `inputs()`
    pub fn evaluate(&self, v: &[Pixel]) -> Pixel {
        match self {
            SpectralIndex::Ndwi
            | SpectralIndex::Ndmi
            | SpectralIndex::Ndvi
            | SpectralIndex::Ndre1
            | SpectralIndex::Bnri => normalized_difference(v[0], v[1]),
            SpectralIndex::Msi => safe_ratio(v[0], v[1]),
            SpectralIndex::Evi => {
                let (nir, red, blue) = (v[0], v[1], v[2]);
                2.5 * safe_ratio(nir - red, nir + 6.0 * red - 7.5 * blue + 1.0)
            }
            SpectralIndex::Evi2 => {
                let (nir, red) = (v[0], v[1]);
                2.4 * safe_ratio(nir - red, nir + red + 1.0)
            }
            SpectralIndex::Bsi => normalized_difference(v[0] + v[1], v[2] + v[3]),
        }
    }

    /// Compute this index for a whole scene; missing inputs yield an all no-data grid
    pub fn compute(&self, scene: &Scene) -> Grid {
        let dim = scene.geometry().dim();
        let views: Option<Vec<ArrayView2<'_, Pixel>>> = self
            .inputs()
            .iter()
            .map(|name| scene.raster.band(name).map(|b| b.data.view()))
            .collect();

        match views {
            Some(views) => evaluate_pixels(&views, dim, |v| self.evaluate(v)),
            None => {
                log::debug!("Scene {} lacks inputs {:?} for {}; emitting no-data",
                            scene.id, self.inputs(), self.name());
                no_data_grid(dim)
            }
        }
    }
}

impl std::fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `num / den`, or no-data when either side is no-data or `den` is zero
#[inline]
pub fn safe_ratio(num: Pixel, den: Pixel) -> Pixel {
    if !num.is_finite() || !den.is_finite() || den == 0.0 {
        return NO_DATA;
    }
    num / den
}

/// Generic two-band normalized difference `(a - b) / (a + b)`; 0/0 is no-data
#[inline]
pub fn normalized_difference(a: Pixel, b: Pixel) -> Pixel {
    safe_ratio(a - b, a + b)
}

/// Grid form of `normalized_difference`
pub fn normalized_difference_grid(a: &ArrayView2<'_, Pixel>, b: &ArrayView2<'_, Pixel>) -> Grid {
    evaluate_pixels(&[a.view(), b.view()], a.dim(), |v| normalized_difference(v[0], v[1]))
}

/// Appends spectral index bands to scenes
#[derive(Debug, Clone)]
pub struct IndexEngine {
    indices: Vec<SpectralIndex>,
}

impl Default for IndexEngine {
    fn default() -> Self {
        Self::new(SpectralIndex::ALL.to_vec())
    }
}

impl IndexEngine {
    pub fn new(indices: Vec<SpectralIndex>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[SpectralIndex] {
        &self.indices
    }

    /// Return a new scene holding the original bands followed by the index bands.
    ///
    /// Fails only when an index band name already exists in the scene.
    pub fn compute_indices(&self, scene: &Scene) -> ChangeResult<Scene> {
        log::debug!("Computing {} spectral indices for scene {}", self.indices.len(), scene.id);

        let mut raster = scene.raster.clone();
        for index in &self.indices {
            raster.push_band(Band::new(index.name(), index.compute(scene)))?;
        }
        Ok(scene.with_raster(raster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ndvi_value() {
        let ndvi = SpectralIndex::Ndvi.evaluate(&[0.5, 0.1]);
        assert_relative_eq!(ndvi, 0.666_666_7, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_over_zero_is_no_data() {
        assert!(normalized_difference(0.0, 0.0).is_nan());
        assert!(SpectralIndex::Ndvi.evaluate(&[0.0, 0.0]).is_nan());
        assert!(SpectralIndex::Msi.evaluate(&[0.2, 0.0]).is_nan());
    }

    #[test]
    fn test_no_data_input_propagates() {
        for index in SpectralIndex::ALL {
            let mut values = vec![0.2f32; index.inputs().len()];
            values[0] = NO_DATA;
            assert!(index.evaluate(&values).is_nan(), "{} should propagate no-data", index);
        }
    }

    #[test]
    fn test_evi_formulas() {
        // 2.5 * (0.5 - 0.1) / (0.5 + 0.6 - 0.375 + 1) = 1.0 / 1.725
        assert_relative_eq!(SpectralIndex::Evi.evaluate(&[0.5, 0.1, 0.05]), 1.0 / 1.725, epsilon = 1e-6);
        // 2.4 * 0.4 / 1.6
        assert_relative_eq!(SpectralIndex::Evi2.evaluate(&[0.5, 0.1]), 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_evi_not_clamped_for_negative_denominator() {
        // denominator: 0.1 + 0.6 - 7.5 + 1 = -5.8
        let evi = SpectralIndex::Evi.evaluate(&[0.1, 0.1, 1.0]);
        assert_eq!(evi, 0.0);
        let evi = SpectralIndex::Evi.evaluate(&[0.2, 0.1, 1.0]);
        assert!(evi < 0.0);
    }

    #[test]
    fn test_bsi_matches_expanded_formula() {
        let (red, swir1, nir, blue) = (0.2f32, 0.3, 0.4, 0.05);
        let expected = ((red + swir1) - (nir + blue)) / ((red + swir1) + (nir + blue));
        assert_relative_eq!(SpectralIndex::Bsi.evaluate(&[red, swir1, nir, blue]), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_names_round_trip_and_are_unique() {
        for index in SpectralIndex::ALL {
            assert_eq!(SpectralIndex::from_name(index.name()), Some(index));
        }
        let mut names: Vec<_> = SpectralIndex::ALL.iter().map(|i| i.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 9);
    }
}
