//! Display defaults for the presentation layer.
//!
//! Band ranges here are stable so renderers can pick a stretch without
//! looking at the data.

use serde::{Deserialize, Serialize};

use crate::core::cluster_labels::{ClassLegendEntry, Color, ClusterLegendConfig};
use crate::core::indices::SpectralIndex;
use crate::core::terrain::TerrainParams;

/// Min/max stretch with an optional palette or band triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    pub bands: Vec<String>,
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
    pub gamma: Option<f64>,
}

impl VisParams {
    fn ramp(min: f64, max: f64, palette: &[&str]) -> Self {
        Self {
            bands: Vec::new(),
            min,
            max,
            palette: palette.iter().map(|p| p.to_string()).collect(),
            gamma: None,
        }
    }

    /// Seasonal composite NDVI
    pub fn composite_ndvi() -> Self {
        Self::ramp(0.0, 0.8, &["red", "yellow", "green"])
    }

    /// Summer minus winter NDVI
    pub fn ndvi_difference() -> Self {
        Self::ramp(-0.5, 0.5, &["red", "Silver", "green"])
    }

    /// Summer minus winter NDWI
    pub fn ndwi_difference() -> Self {
        Self::ramp(-0.5, 0.5, &["lightblue", "Silver", "blue"])
    }

    /// True colour from a suffixed composite, e.g. `_sum` gives B4_sum/B3_sum/B2_sum
    pub fn true_color(suffix: &str) -> Self {
        Self {
            bands: ["B4", "B3", "B2"].iter().map(|b| format!("{}{}", b, suffix)).collect(),
            min: 0.0,
            max: 0.3,
            palette: Vec::new(),
            gamma: Some(1.2),
        }
    }

    /// DEM slope in degrees, stretched over the gentle range
    pub fn slope() -> Self {
        Self::ramp(0.0, 30.0, &["white", "orange", "red"])
    }

    /// Distance to rivers in metres
    pub fn river_distance() -> Self {
        Self::ramp(0.0, 2000.0, &["white", "blue", "darkblue"])
    }

    /// Categorical cluster display, 0..K-1 over the full palette
    pub fn clusters(legend: &ClusterLegendConfig) -> Self {
        Self {
            bands: Vec::new(),
            min: 0.0,
            max: legend.k.saturating_sub(1) as f64,
            palette: legend.palette.iter().map(|c| c.to_hex()).collect(),
            gamma: None,
        }
    }

    /// Linear position of `value` in [0, 1] along the stretch, `None` for no-data
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || self.max <= self.min {
            return None;
        }
        Some(((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0))
    }
}

/// Nominal value range of a band name as produced by this crate.
///
/// Season and reducer suffixes are ignored; `Dif_` bands span [-2, 2].
/// Slope spans [0, 90] degrees; river distance is metres, nominally up to 2 km.
pub fn nominal_range(band: &str) -> (f64, f64) {
    if band.starts_with("Dif_") {
        return (-2.0, 2.0);
    }
    let terrain = TerrainParams::default();
    if band == terrain.slope_band {
        return (0.0, 90.0);
    }
    if band == terrain.distance_band {
        return (0.0, 2000.0);
    }
    let base = band.split('_').next().unwrap_or(band);
    match SpectralIndex::from_name(base) {
        Some(SpectralIndex::Msi) => (0.0, 3.0),
        Some(_) => (-1.0, 1.0),
        None => (0.0, 1.0),
    }
}

/// Legend rows for a difference map: loss, no change, gain
pub fn difference_legend(index: SpectralIndex) -> Vec<(Color, String)> {
    match index {
        SpectralIndex::Ndwi => vec![
            (Color::rgb(0xAD, 0xD8, 0xE6), "Lower NDWI (water loss)".to_string()),
            (Color::rgb(0x80, 0x80, 0x80), "No change".to_string()),
            (Color::rgb(0x00, 0x00, 0xFF), "Higher NDWI (water gain)".to_string()),
        ],
        other => vec![
            (Color::rgb(0xFF, 0x00, 0x00), format!("Lower {} (vegetation loss)", other)),
            (Color::rgb(0x80, 0x80, 0x80), "No change".to_string()),
            (Color::rgb(0x00, 0x80, 0x00), format!("Higher {} (vegetation gain)", other)),
        ],
    }
}

/// Legend rows for the cluster map, `{cluster_id, color, label}`
pub fn cluster_legend(legend: &ClusterLegendConfig) -> Vec<ClassLegendEntry> {
    legend.simplified_classes.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_ranges() {
        assert_eq!(nominal_range("B4_sum"), (0.0, 1.0));
        assert_eq!(nominal_range("NDVI_win"), (-1.0, 1.0));
        assert_eq!(nominal_range("NDWI_median_sum"), (-1.0, 1.0));
        assert_eq!(nominal_range("MSI"), (0.0, 3.0));
        assert_eq!(nominal_range("Dif_NDVI"), (-2.0, 2.0));
        assert_eq!(nominal_range("slope"), (0.0, 90.0));
        assert_eq!(nominal_range("river_distance"), (0.0, 2000.0));
    }

    #[test]
    fn test_presets() {
        let rgb = VisParams::true_color("_median_sum");
        assert_eq!(rgb.bands, vec!["B4_median_sum", "B3_median_sum", "B2_median_sum"]);
        assert_eq!(rgb.gamma, Some(1.2));

        let clusters = VisParams::clusters(&ClusterLegendConfig::default());
        assert_eq!(clusters.max, 7.0);
        assert_eq!(clusters.palette.len(), 8);

        assert_eq!(VisParams::slope().max, 30.0);
        assert_eq!(VisParams::river_distance().normalize(1000.0), Some(0.5));

        let diff = VisParams::ndvi_difference();
        assert_eq!(diff.normalize(0.0), Some(0.5));
        assert_eq!(diff.normalize(2.0), Some(1.0));
        assert_eq!(diff.normalize(f64::NAN), None);
    }

    #[test]
    fn test_difference_legends_have_three_rows() {
        assert_eq!(difference_legend(SpectralIndex::Ndvi).len(), 3);
        assert_eq!(difference_legend(SpectralIndex::Ndwi)[2].0.to_hex(), "0000FF");
    }
}
