#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use ndarray::Array2;
use seasonal_change::types::{
    CoordinateSystem, GeoTransform, Grid, GridGeometry, Raster, Scene, SceneMetadata,
};

/// Vegetation SCL code, always usable
pub const SCL_VEGETATION: u8 = 4;
/// Cloud high probability SCL code, always masked
pub const SCL_CLOUD_HIGH: u8 = 9;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Small geographic grid over San Juan, Argentina
pub fn geometry(rows: usize, cols: usize) -> GridGeometry {
    GridGeometry::new(
        rows,
        cols,
        GeoTransform::north_up(-68.60, -31.50, 0.0001),
        CoordinateSystem::Geographic,
    )
}

/// Scene with uniform digital numbers per band and a uniform SCL code
pub fn uniform_scene(
    id: &str,
    date: (i32, u32, u32),
    geometry: GridGeometry,
    bands: &[(&str, f32)],
    scl: u8,
) -> Scene {
    let grids: Vec<(&str, Grid)> = bands
        .iter()
        .map(|&(name, dn)| (name, Grid::from_elem(geometry.dim(), dn)))
        .collect();
    scene_from_grids(id, date, geometry, grids, Array2::from_elem(geometry.dim(), scl))
}

pub fn scene_from_grids(
    id: &str,
    date: (i32, u32, u32),
    geometry: GridGeometry,
    bands: Vec<(&str, Grid)>,
    scl: Array2<u8>,
) -> Scene {
    let mut raster = Raster::new(geometry);
    for (name, grid) in bands {
        raster = raster.with_band(name, grid).expect("fixture band");
    }
    let metadata = SceneMetadata {
        acquired: Utc
            .with_ymd_and_hms(date.0, date.1, date.2, 14, 20, 0)
            .single()
            .expect("fixture date"),
        cloudy_pixel_percentage: 5.0,
    };
    Scene::new(id, metadata, raster)
        .with_scene_classification(scl)
        .expect("fixture SCL shape")
}

/// DN values giving a target NDVI with red fixed at 0.1 reflectance
pub fn vegetation_bands(ndvi: f32) -> Vec<(&'static str, f32)> {
    let red = 0.1f32;
    let nir = red * (1.0 + ndvi) / (1.0 - ndvi);
    vec![
        ("B2", 400.0),
        ("B3", 600.0),
        ("B4", red * 10_000.0),
        ("B8", nir * 10_000.0),
        ("B11", 1500.0),
    ]
}

/// Grid equality treating NaN as equal to NaN
pub fn same_grid(a: &Grid, b: &Grid) -> bool {
    a.dim() == b.dim()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
}
