use crate::types::{Band, ChangeError, ChangeResult, GridGeometry, Pixel, Raster};

/// Multi-band raster handed to clustering and export
#[derive(Debug, Clone)]
pub struct FeatureStack {
    raster: Raster,
}

impl FeatureStack {
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn into_raster(self) -> Raster {
        self.raster
    }

    pub fn geometry(&self) -> &GridGeometry {
        self.raster.geometry()
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.raster.band_names()
    }

    pub fn band_count(&self) -> usize {
        self.raster.band_count()
    }

    /// Feature vector of one pixel in band order, `None` if any band is no-data
    pub fn feature_vector(&self, row: usize, col: usize) -> Option<Vec<Pixel>> {
        let (rows, cols) = self.geometry().dim();
        if row >= rows || col >= cols {
            return None;
        }
        self.raster
            .bands()
            .iter()
            .map(|b| {
                let v = b.data[[row, col]];
                v.is_finite().then_some(v)
            })
            .collect()
    }

    /// Pixels where every band carries a value
    pub fn complete_pixel_count(&self) -> usize {
        let (rows, cols) = self.geometry().dim();
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter(|&(r, c)| self.raster.bands().iter().all(|b| b.data[[r, c]].is_finite()))
            .count()
    }
}

/// Concatenates rasters into a feature stack
#[derive(Debug, Clone, Default)]
pub struct Stacker;

impl Stacker {
    pub fn new() -> Self {
        Self
    }

    /// Concatenate the bands of `parts` in order.
    ///
    /// Every part must share the first part's extent, resolution and CRS, and
    /// final band names must be unique; both are configuration errors.
    pub fn stack(&self, parts: &[&Raster]) -> ChangeResult<FeatureStack> {
        let first = parts.first().ok_or_else(|| {
            ChangeError::Configuration("cannot stack an empty list of rasters".to_string())
        })?;
        let geometry = *first.geometry();

        let mut raster = Raster::new(geometry);
        for (i, part) in parts.iter().enumerate() {
            geometry.ensure_matches(part.geometry(), &format!("stack part {}", i))?;
            for band in part.bands() {
                raster.push_band(band.clone())?;
            }
        }

        log::info!("Feature stack: {} bands {:?}", raster.band_count(), raster.band_names());
        Ok(FeatureStack { raster })
    }

    /// Stack individually named single grids on one geometry
    pub fn stack_named(&self, geometry: GridGeometry, grids: Vec<Band>) -> ChangeResult<FeatureStack> {
        let raster = Raster::from_bands(geometry, grids)?;
        self.stack(&[&raster])
    }
}
