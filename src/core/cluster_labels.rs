//! Cluster label rendering and the analyst-curated class legend.

use ndarray::{Array3, Zip};
use serde::{Deserialize, Serialize};

use crate::types::{ChangeError, ChangeResult, LabelGrid};

/// Opaque RGB colour, written as 6-digit hex (`A52A2A`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` with an optional leading `#`
    pub fn from_hex(hex: &str) -> ChangeResult<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChangeError::InvalidColor(hex.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ChangeError::InvalidColor(hex.to_string()))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = ChangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// One row of the simplified legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLegendEntry {
    pub cluster_id: u32,
    pub color: Color,
    pub label: String,
}

impl ClassLegendEntry {
    pub fn new(cluster_id: u32, color: Color, label: impl Into<String>) -> Self {
        Self {
            cluster_id,
            color,
            label: label.into(),
        }
    }
}

/// Cluster count, full palette and simplified classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterLegendConfig {
    /// Number of clusters K
    pub k: usize,
    /// One colour per cluster id, index 0..K-1
    pub palette: Vec<Color>,
    /// Classes shown in the simplified legend, in display order
    pub simplified_classes: Vec<ClassLegendEntry>,
}

impl Default for ClusterLegendConfig {
    fn default() -> Self {
        Self {
            k: 8,
            palette: vec![
                Color::rgb(0xC0, 0xC0, 0xC0), // silver
                Color::rgb(0xA5, 0x2A, 0x2A), // brown
                Color::rgb(0x80, 0x80, 0x00), // olive
                Color::rgb(0xEE, 0xE8, 0xAA), // pale goldenrod
                Color::rgb(0x22, 0x8B, 0x22), // forest green
                Color::rgb(0x3C, 0xB3, 0x71), // medium sea green
                Color::rgb(0xA9, 0xA9, 0xA9), // dark gray
                Color::rgb(0xA9, 0xA9, 0xA9),
            ],
            simplified_classes: vec![
                ClassLegendEntry::new(1, Color::rgb(0xA5, 0x2A, 0x2A), "Non-associated vegetation"),
                ClassLegendEntry::new(5, Color::rgb(0x3C, 0xB3, 0x71), "Partially coupled vegetation"),
                ClassLegendEntry::new(4, Color::rgb(0x22, 0x8B, 0x22), "Coupled vegetation"),
                ClassLegendEntry::new(3, Color::rgb(0xEE, 0xE8, 0xAA), "Uncoupled vegetation"),
            ],
        }
    }
}

/// How one cluster id is displayed
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDisplay {
    pub color: Color,
    /// Legend text, present only for simplified classes
    pub text: Option<String>,
}

/// Maps externally produced cluster ids to colours and class names
#[derive(Debug, Clone)]
pub struct ClusterLabelMapper {
    config: ClusterLegendConfig,
}

impl ClusterLabelMapper {
    /// Validate the legend configuration.
    ///
    /// The palette must hold exactly K colours and every simplified class
    /// must name a distinct cluster id below K.
    pub fn new(config: ClusterLegendConfig) -> ChangeResult<Self> {
        if config.k == 0 {
            return Err(ChangeError::Configuration("cluster count K must be positive".to_string()));
        }
        if config.palette.len() != config.k {
            return Err(ChangeError::Palette(format!(
                "palette has {} colours, expected K = {}",
                config.palette.len(),
                config.k
            )));
        }
        for (i, entry) in config.simplified_classes.iter().enumerate() {
            if entry.cluster_id as usize >= config.k {
                return Err(ChangeError::LabelOutOfRange {
                    label: entry.cluster_id,
                    k: config.k,
                });
            }
            if config.simplified_classes[..i]
                .iter()
                .any(|e| e.cluster_id == entry.cluster_id)
            {
                return Err(ChangeError::Configuration(format!(
                    "cluster {} appears twice in the simplified legend",
                    entry.cluster_id
                )));
            }
        }
        Ok(Self { config })
    }

    pub fn k(&self) -> usize {
        self.config.k
    }

    pub fn palette(&self) -> &[Color] {
        &self.config.palette
    }

    /// Simplified legend rows in display order
    pub fn legend(&self) -> &[ClassLegendEntry] {
        &self.config.simplified_classes
    }

    /// Display colour and optional legend text for one label
    pub fn map_label(&self, label: u32) -> ChangeResult<LabelDisplay> {
        let k = self.config.k;
        let palette_color = self
            .config
            .palette
            .get(label as usize)
            .copied()
            .ok_or(ChangeError::LabelOutOfRange { label, k })?;

        Ok(match self.config.simplified_classes.iter().find(|e| e.cluster_id == label) {
            Some(entry) => LabelDisplay {
                color: entry.color,
                text: Some(entry.label.clone()),
            },
            None => LabelDisplay {
                color: palette_color,
                text: None,
            },
        })
    }

    /// Render a label grid as RGBA (rows x cols x 4); masked pixels are transparent.
    pub fn render(&self, labels: &LabelGrid) -> ChangeResult<Array3<u8>> {
        let k = self.config.k;
        if let Some(bad) = labels.iter().flatten().find(|&&l| l as usize >= k) {
            return Err(ChangeError::LabelOutOfRange { label: *bad, k });
        }

        let (rows, cols) = labels.dim();
        let mut rgba = Array3::<u8>::zeros((rows, cols, 4));
        Zip::from(rgba.lanes_mut(ndarray::Axis(2)))
            .and(labels)
            .for_each(|mut px, label| {
                if let Some(l) = label {
                    let c = self.config.palette[*l as usize];
                    px[0] = c.r;
                    px[1] = c.g;
                    px[2] = c.b;
                    px[3] = 255;
                }
            });
        Ok(rgba)
    }
}
