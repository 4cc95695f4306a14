use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Pixel value type for every reflectance, index and difference grid.
///
/// No-data is encoded as `NaN`, never as zero.
pub type Pixel = f32;

/// The no-data marker.
pub const NO_DATA: Pixel = Pixel::NAN;

/// 2D grid of pixel values (rows x cols)
pub type Grid = Array2<Pixel>;

/// Per-pixel usability mask, `true` = usable
pub type Mask = Array2<bool>;

/// Per-pixel cluster labels as returned by a clustering backend (`None` = masked)
pub type LabelGrid = Array2<Option<u32>>;

/// Returns true when a pixel carries a value.
#[inline]
pub fn is_valid(value: Pixel) -> bool {
    value.is_finite()
}

/// Coordinate reference system of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Geographic coordinates (latitude, longitude), EPSG:4326
    Geographic,
    /// Projected coordinates (e.g., UTM)
    Projected { epsg: u32 },
}

impl CoordinateSystem {
    pub fn epsg(&self) -> u32 {
        match self {
            CoordinateSystem::Geographic => 4326,
            CoordinateSystem::Projected { epsg } => *epsg,
        }
    }
}

impl std::fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// True when the two boxes share any area (touching edges count)
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

/// Geospatial transformation parameters (GDAL ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform without rotation
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_size: f64) -> Self {
        Self {
            top_left_x,
            pixel_width: pixel_size,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height: -pixel_size,
        }
    }
}

/// Spatial extent, resolution and CRS shared by every band of a raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: CoordinateSystem,
}

impl GridGeometry {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform, crs: CoordinateSystem) -> Self {
        Self { rows, cols, transform, crs }
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Footprint of the grid in its own CRS units
    pub fn bounding_box(&self) -> BoundingBox {
        let t = &self.transform;
        let x0 = t.top_left_x;
        let x1 = t.top_left_x + t.pixel_width * self.cols as f64;
        let y0 = t.top_left_y;
        let y1 = t.top_left_y + t.pixel_height * self.rows as f64;
        BoundingBox {
            min_lon: x0.min(x1),
            max_lon: x0.max(x1),
            min_lat: y0.min(y1),
            max_lat: y0.max(y1),
        }
    }

    /// Fails with `GridMismatch` unless extent, resolution and CRS are identical
    pub fn ensure_matches(&self, other: &GridGeometry, context: &str) -> ChangeResult<()> {
        if self != other {
            return Err(ChangeError::GridMismatch(format!(
                "{}: {}x{} {} at ({}, {}) vs {}x{} {} at ({}, {})",
                context,
                self.rows,
                self.cols,
                self.crs,
                self.transform.top_left_x,
                self.transform.top_left_y,
                other.rows,
                other.cols,
                other.crs,
                other.transform.top_left_x,
                other.transform.top_left_y,
            )));
        }
        Ok(())
    }
}

/// One named 2D grid
#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub data: Grid,
}

impl Band {
    pub fn new(name: impl Into<String>, data: Grid) -> Self {
        Self { name: name.into(), data }
    }
}

/// Multi-band raster with ordered, uniquely named bands on one geometry
#[derive(Debug, Clone)]
pub struct Raster {
    geometry: GridGeometry,
    bands: Vec<Band>,
}

impl Raster {
    /// Create an empty raster on the given geometry
    pub fn new(geometry: GridGeometry) -> Self {
        Self { geometry, bands: Vec::new() }
    }

    /// Build a raster from bands, checking shapes and name uniqueness
    pub fn from_bands(geometry: GridGeometry, bands: Vec<Band>) -> ChangeResult<Self> {
        let mut raster = Self::new(geometry);
        for band in bands {
            raster.push_band(band)?;
        }
        Ok(raster)
    }

    /// Builder-style `push_band`
    pub fn with_band(mut self, name: impl Into<String>, data: Grid) -> ChangeResult<Self> {
        self.push_band(Band::new(name, data))?;
        Ok(self)
    }

    pub fn push_band(&mut self, band: Band) -> ChangeResult<()> {
        if band.data.dim() != self.geometry.dim() {
            return Err(ChangeError::GridMismatch(format!(
                "band '{}' has shape {:?}, raster is {:?}",
                band.name,
                band.data.dim(),
                self.geometry.dim()
            )));
        }
        if self.contains(&band.name) {
            return Err(ChangeError::DuplicateBand(band.name));
        }
        self.bands.push(band);
        Ok(())
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bands.iter().any(|b| b.name == name)
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.name == name)
    }

    /// Like `band` but a missing band is an error
    pub fn require(&self, name: &str) -> ChangeResult<&Band> {
        self.band(name)
            .ok_or_else(|| ChangeError::MissingBand(name.to_string()))
    }

    /// Copy of this raster with `suffix` appended to every band name
    pub fn with_suffix(&self, suffix: &str) -> Raster {
        Raster {
            geometry: self.geometry,
            bands: self
                .bands
                .iter()
                .map(|b| Band::new(format!("{}{}", b.name, suffix), b.data.clone()))
                .collect(),
        }
    }

    /// Apply `f` to every band whose name satisfies `select`, cloning the rest
    pub fn map_bands<S, F>(&self, select: S, f: F) -> Raster
    where
        S: Fn(&str) -> bool,
        F: Fn(&Grid) -> Grid,
    {
        Raster {
            geometry: self.geometry,
            bands: self
                .bands
                .iter()
                .map(|b| {
                    if select(&b.name) {
                        Band::new(b.name.clone(), f(&b.data))
                    } else {
                        b.clone()
                    }
                })
                .collect(),
        }
    }

    /// Number of valid pixels per band, in band order
    pub fn valid_counts(&self) -> Vec<(String, usize)> {
        self.bands
            .iter()
            .map(|b| (b.name.clone(), b.data.iter().filter(|v| is_valid(**v)).count()))
            .collect()
    }
}

/// Scene-level metadata carried alongside the pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    /// Acquisition timestamp (`system:time_start`)
    pub acquired: DateTime<Utc>,
    /// Scene cloud-cover percentage (`CLOUDY_PIXEL_PERCENTAGE`)
    pub cloudy_pixel_percentage: f32,
}

/// Per-pixel auxiliary bands used for masking; never scaled
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryBands {
    /// Cloud probability in percent (`MSK_CLDPRB`)
    pub cloud_probability: Option<Grid>,
    /// Snow probability in percent (`MSK_SNWPRB`)
    pub snow_probability: Option<Grid>,
    /// Scene classification codes (`SCL`)
    pub scene_classification: Option<Array2<u8>>,
}

/// A single satellite observation
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub metadata: SceneMetadata,
    pub raster: Raster,
    pub auxiliary: AuxiliaryBands,
}

impl Scene {
    pub fn new(id: impl Into<String>, metadata: SceneMetadata, raster: Raster) -> Self {
        Self {
            id: id.into(),
            metadata,
            raster,
            auxiliary: AuxiliaryBands::default(),
        }
    }

    pub fn with_cloud_probability(mut self, grid: Grid) -> ChangeResult<Self> {
        self.check_aux_shape("MSK_CLDPRB", grid.dim())?;
        self.auxiliary.cloud_probability = Some(grid);
        Ok(self)
    }

    pub fn with_snow_probability(mut self, grid: Grid) -> ChangeResult<Self> {
        self.check_aux_shape("MSK_SNWPRB", grid.dim())?;
        self.auxiliary.snow_probability = Some(grid);
        Ok(self)
    }

    pub fn with_scene_classification(mut self, scl: Array2<u8>) -> ChangeResult<Self> {
        self.check_aux_shape("SCL", scl.dim())?;
        self.auxiliary.scene_classification = Some(scl);
        Ok(self)
    }

    pub fn geometry(&self) -> &GridGeometry {
        self.raster.geometry()
    }

    /// Same scene identity and auxiliary bands, new pixel bands
    pub fn with_raster(&self, raster: Raster) -> Scene {
        Scene {
            id: self.id.clone(),
            metadata: self.metadata.clone(),
            raster,
            auxiliary: self.auxiliary.clone(),
        }
    }

    fn check_aux_shape(&self, name: &str, dim: (usize, usize)) -> ChangeResult<()> {
        if dim != self.raster.geometry().dim() {
            return Err(ChangeError::GridMismatch(format!(
                "auxiliary band {} has shape {:?}, scene {} is {:?}",
                name,
                dim,
                self.id,
                self.raster.geometry().dim()
            )));
        }
        Ok(())
    }
}

/// Error types for seasonal change processing
#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Duplicate band name: {0}")]
    DuplicateBand(String),

    #[error("Missing band: {0}")]
    MissingBand(String),

    #[error("Invalid band pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Palette error: {0}")]
    Palette(String),

    #[error("Cluster label {label} outside [0, {k})")]
    LabelOutOfRange { label: u32, k: usize },

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ChangeError {
    /// Caller-facing configuration errors, as opposed to processing failures
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, ChangeError::Processing(_))
    }
}

/// Result type for seasonal change operations
pub type ChangeResult<T> = Result<T, ChangeError>;
