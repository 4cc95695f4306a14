use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::types::{
    ChangeError, ChangeResult, CoordinateSystem, Grid, GridGeometry, Mask, Pixel, Raster, NO_DATA,
};

/// Metres per degree of latitude on the WGS84 mean sphere
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Parameters for terrain ancillary bands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Output band name for slope
    pub slope_band: String,
    /// Output band name for distance to the nearest feature
    pub distance_band: String,
    /// Nominal DEM resolution in metres (SRTM 30 m), used when the grid has none
    pub dem_resolution: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            slope_band: "slope".to_string(),
            distance_band: "river_distance".to_string(),
            dem_resolution: 30.0,
        }
    }
}

/// Derives slope and feature-distance bands from a DEM grid
#[derive(Debug, Clone, Default)]
pub struct TerrainProcessor {
    params: TerrainParams,
}

impl TerrainProcessor {
    pub fn new(params: TerrainParams) -> Self {
        Self { params }
    }

    /// Pixel size in metres (x, y) at the given row
    fn pixel_size_m(&self, geometry: &GridGeometry, row: usize) -> (f64, f64) {
        let t = &geometry.transform;
        let (mut dx, mut dy) = (t.pixel_width.abs(), t.pixel_height.abs());
        if dx == 0.0 || dy == 0.0 {
            return (self.params.dem_resolution, self.params.dem_resolution);
        }
        if geometry.crs == CoordinateSystem::Geographic {
            let lat = t.top_left_y + t.pixel_height * (row as f64 + 0.5);
            dy *= METERS_PER_DEGREE;
            dx *= METERS_PER_DEGREE * lat.to_radians().cos();
        }
        (dx, dy)
    }

    /// Slope in degrees using central differences.
    ///
    /// Edge pixels copy their inner neighbour; a no-data elevation in the
    /// stencil gives no-data slope.
    pub fn slope(&self, dem: &Raster, band: &str) -> ChangeResult<Raster> {
        let geometry = *dem.geometry();
        let elevation = &dem.require(band)?.data;
        let (rows, cols) = elevation.dim();
        if rows < 3 || cols < 3 {
            return Err(ChangeError::Processing(format!(
                "DEM of {}x{} is too small for slope", rows, cols
            )));
        }
        log::info!("Computing slope from {}x{} DEM", rows, cols);

        let mut slope = Grid::from_elem((rows, cols), NO_DATA);
        for i in 1..rows - 1 {
            let (dx, dy) = self.pixel_size_m(&geometry, i);
            for j in 1..cols - 1 {
                let dz_dx = (elevation[[i, j + 1]] - elevation[[i, j - 1]]) as f64 / (2.0 * dx);
                let dz_dy = (elevation[[i + 1, j]] - elevation[[i - 1, j]]) as f64 / (2.0 * dy);
                let rise = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();
                slope[[i, j]] = if rise.is_finite() {
                    rise.atan().to_degrees() as Pixel
                } else {
                    NO_DATA
                };
            }
        }
        fill_edges(&mut slope);

        Raster::new(geometry).with_band(self.params.slope_band.clone(), slope)
    }

    /// Euclidean distance in metres from every pixel to the nearest `true` pixel.
    ///
    /// An empty feature mask gives an all no-data band.
    pub fn distance_to_features(&self, geometry: &GridGeometry, features: &Mask) -> ChangeResult<Raster> {
        if features.dim() != geometry.dim() {
            return Err(ChangeError::GridMismatch(format!(
                "feature mask {:?} vs grid {:?}", features.dim(), geometry.dim()
            )));
        }
        let distance = if features.iter().any(|&f| f) {
            let squared = squared_distance_transform(features);
            let mut out = Grid::from_elem(geometry.dim(), NO_DATA);
            for ((i, j), d2) in squared.indexed_iter() {
                // pixel-unit distance scaled by the mean pixel size at that row
                let (dx, dy) = self.pixel_size_m(geometry, i);
                out[[i, j]] = (d2.sqrt() * (dx * dy).sqrt()) as Pixel;
            }
            out
        } else {
            log::warn!("Feature mask is empty; distance band is all no-data");
            Grid::from_elem(geometry.dim(), NO_DATA)
        };

        Raster::new(*geometry).with_band(self.params.distance_band.clone(), distance)
    }
}

/// Copy edge rows and columns from their inner neighbours
fn fill_edges(array: &mut Grid) {
    let (rows, cols) = array.dim();
    for j in 0..cols {
        array[[0, j]] = array[[1, j]];
        array[[rows - 1, j]] = array[[rows - 2, j]];
    }
    for i in 0..rows {
        array[[i, 0]] = array[[i, 1]];
        array[[i, cols - 1]] = array[[i, cols - 2]];
    }
}

/// Exact squared Euclidean distance transform in pixel units (Felzenszwalb & Huttenlocher)
pub fn squared_distance_transform(features: &Mask) -> Array2<f64> {
    let (rows, cols) = features.dim();
    let mut grid = features.mapv(|f| if f { 0.0 } else { f64::INFINITY });

    let mut buffer = Vec::new();
    for j in 0..cols {
        buffer.clear();
        buffer.extend((0..rows).map(|i| grid[[i, j]]));
        let out = distance_1d(&buffer);
        for i in 0..rows {
            grid[[i, j]] = out[i];
        }
    }
    for i in 0..rows {
        buffer.clear();
        buffer.extend((0..cols).map(|j| grid[[i, j]]));
        let out = distance_1d(&buffer);
        for j in 0..cols {
            grid[[i, j]] = out[j];
        }
    }
    grid
}

/// Lower envelope of parabolas rooted at `f`
fn distance_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut d = vec![f64::INFINITY; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    let mut started = false;

    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        if !started {
            v[0] = q;
            z[0] = f64::NEG_INFINITY;
            z[1] = f64::INFINITY;
            started = true;
            continue;
        }
        loop {
            let p = v[k];
            let s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64)) / (2.0 * (q as f64 - p as f64));
            // z[0] is -inf, so k never goes below zero for finite inputs
            if s <= z[k] && k > 0 {
                k -= 1;
            } else {
                k += 1;
                v[k] = q;
                z[k] = s;
                z[k + 1] = f64::INFINITY;
                break;
            }
        }
    }
    if !started {
        return d;
    }

    k = 0;
    for (q, slot) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let diff = q as f64 - p as f64;
        *slot = diff * diff + f[p];
    }
    d
}
