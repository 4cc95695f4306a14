//! Seasonal median compositing.
//!
//! Each output pixel is the median of the valid observations at that pixel
//! across the scenes of one season. Pixels without any valid observation stay
//! no-data. The reduction is independent of scene order.

use ndarray::{Array2, ArrayView2, Zip};
use num_traits::Float;

use crate::core::band_select::BandSelector;
use crate::types::{Band, ChangeResult, Grid, GridGeometry, Pixel, Raster, Scene, NO_DATA};

/// Median of the finite values in `values`; `None` when there are none.
///
/// Even counts average the two middle values. The slice is reordered.
pub fn median_of<T: Float>(values: &mut [T]) -> Option<T> {
    let mut n = 0;
    for i in 0..values.len() {
        if values[i].is_finite() {
            values.swap(n, i);
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    let valid = &mut values[..n];
    valid.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = n / 2;
    if n % 2 == 1 {
        Some(valid[mid])
    } else {
        let two = T::one() + T::one();
        Some((valid[mid - 1] + valid[mid]) / two)
    }
}

/// Per-pixel median across a stack of equally shaped grids
pub fn median_reduce(layers: &[ArrayView2<'_, Pixel>], dim: (usize, usize)) -> Grid {
    let mut out = Grid::from_elem(dim, NO_DATA);
    let kernel = |idx: (usize, usize), o: &mut Pixel| {
        let mut values: Vec<Pixel> = layers.iter().map(|layer| layer[idx]).collect();
        *o = median_of(&mut values).unwrap_or(NO_DATA);
    };

    #[cfg(feature = "parallel")]
    Zip::indexed(&mut out).par_for_each(kernel);
    #[cfg(not(feature = "parallel"))]
    Zip::indexed(&mut out).for_each(kernel);

    out
}

/// Number of valid observations per pixel
pub fn valid_observation_counts(layers: &[ArrayView2<'_, Pixel>], dim: (usize, usize)) -> Array2<u32> {
    let mut counts = Array2::<u32>::zeros(dim);
    for layer in layers {
        Zip::from(&mut counts).and(layer).for_each(|c, &v| {
            if v.is_finite() {
                *c += 1;
            }
        });
    }
    counts
}

/// One season's composite raster with its provenance
#[derive(Debug, Clone)]
pub struct Composite {
    /// Median bands, in selection order
    pub raster: Raster,
    /// Scenes that went into the reduction
    pub scene_count: usize,
    /// Valid observations per pixel for the first selected band
    pub observation_counts: Array2<u32>,
}

impl Composite {
    /// True when no band has a single valid pixel
    pub fn is_degenerate(&self) -> bool {
        self.raster
            .bands()
            .iter()
            .all(|b| b.data.iter().all(|v| !v.is_finite()))
    }

    /// Fraction of pixels of the first band without any valid observation
    pub fn empty_fraction(&self) -> f64 {
        let total = self.observation_counts.len();
        if total == 0 {
            return 1.0;
        }
        let empty = self.observation_counts.iter().filter(|&&c| c == 0).count();
        empty as f64 / total as f64
    }

    /// Rename bands the way a named reducer does, e.g. `NDVI` -> `NDVI_median`
    pub fn with_reducer_suffix(self, suffix: &str) -> Composite {
        Composite {
            raster: self.raster.with_suffix(suffix),
            ..self
        }
    }
}

/// Reduces one season of scenes into a median composite
#[derive(Debug, Clone)]
pub struct SeasonalAggregator {
    selector: BandSelector,
    geometry: GridGeometry,
}

impl SeasonalAggregator {
    /// `geometry` is the target grid; every scene must already share it
    pub fn new(selector: BandSelector, geometry: GridGeometry) -> Self {
        Self { selector, geometry }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Median composite of the selected bands over `scenes`.
    ///
    /// A scene lacking a selected band contributes no-data for that band.
    /// Zero scenes, or scenes without valid pixels, give an all no-data
    /// composite that is reported through `Composite::is_degenerate`.
    pub fn aggregate(&self, scenes: &[Scene]) -> ChangeResult<Composite> {
        let bands = self.selector.resolve_known()?;
        for scene in scenes {
            self.geometry
                .ensure_matches(scene.geometry(), &format!("scene {}", scene.id))?;
        }

        let dim = self.geometry.dim();
        log::info!("Compositing {} scenes into {} bands ({}x{})",
                   scenes.len(), bands.len(), dim.0, dim.1);

        let missing = Grid::from_elem(dim, NO_DATA);
        let mut raster = Raster::new(self.geometry);
        let mut observation_counts = Array2::<u32>::zeros(dim);

        for (i, name) in bands.iter().enumerate() {
            let layers: Vec<ArrayView2<'_, Pixel>> = scenes
                .iter()
                .map(|scene| match scene.raster.band(name) {
                    Some(band) => band.data.view(),
                    None => {
                        log::debug!("Scene {} has no band {}", scene.id, name);
                        missing.view()
                    }
                })
                .collect();

            if i == 0 {
                observation_counts = valid_observation_counts(&layers, dim);
            }
            raster.push_band(Band::new(name.clone(), median_reduce(&layers, dim)))?;
        }

        let composite = Composite {
            raster,
            scene_count: scenes.len(),
            observation_counts,
        };

        if composite.is_degenerate() {
            log::warn!("Composite from {} scenes has no valid pixels", scenes.len());
        } else {
            log::debug!("Composite empty fraction: {:.3}", composite.empty_fraction());
        }
        Ok(composite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_median_odd_even_and_no_data() {
        assert_eq!(median_of(&mut [3.0f32, 1.0, 2.0]), Some(2.0));
        assert_eq!(median_of(&mut [4.0f32, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median_of(&mut [f32::NAN, 0.6]), Some(0.6));
        assert_eq!(median_of::<f32>(&mut [f32::NAN, f32::NAN]), None);
        assert_eq!(median_of::<f64>(&mut []), None);
    }

    #[test]
    fn test_median_reduce_ignores_invalid_observations() {
        let a = array![[0.2f32, f32::NAN]];
        let b = array![[f32::NAN, f32::NAN]];
        let c = array![[0.6f32, f32::NAN]];
        let out = median_reduce(&[a.view(), b.view(), c.view()], (1, 2));
        assert!((out[[0, 0]] - 0.4).abs() < 1e-6);
        assert!(out[[0, 1]].is_nan());

        let counts = valid_observation_counts(&[a.view(), b.view(), c.view()], (1, 2));
        assert_eq!(counts, array![[2u32, 0]]);
    }
}
