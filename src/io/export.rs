use serde::{Deserialize, Serialize};

use crate::core::stack::FeatureStack;
use crate::types::{ChangeError, ChangeResult, CoordinateSystem};

/// Output formats the export layer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    GeoTiff,
    TfRecord,
}

/// Persistence request for a feature stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub description: String,
    pub folder: String,
    pub file_name_prefix: String,
    /// Output resolution in metres
    pub scale: f64,
    pub crs: CoordinateSystem,
    pub file_format: ExportFormat,
    /// Largest pixel count the export may write
    pub max_pixels: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            description: "Export_Sentinel2_Stack_Tesis".to_string(),
            folder: "TESIS_GEE".to_string(),
            file_name_prefix: "S2_Seasonal_Composite_SanJuan".to_string(),
            scale: 10.0,
            crs: CoordinateSystem::Geographic,
            file_format: ExportFormat::GeoTiff,
            max_pixels: 1e13,
        }
    }
}

impl ExportConfig {
    /// Check the request against the stack it will persist
    pub fn validate(&self, stack: &FeatureStack) -> ChangeResult<()> {
        if self.file_name_prefix.trim().is_empty() {
            return Err(ChangeError::Configuration("export file name prefix is empty".to_string()));
        }
        if !(self.scale > 0.0) {
            return Err(ChangeError::Configuration(format!("export scale {} must be positive", self.scale)));
        }
        let pixels = stack.geometry().pixel_count() as f64;
        if pixels > self.max_pixels {
            return Err(ChangeError::Configuration(format!(
                "stack has {} pixels, export budget is {}", pixels, self.max_pixels
            )));
        }
        Ok(())
    }
}

/// Writes a feature stack somewhere outside this crate
pub trait StackExporter {
    fn export(&self, stack: &FeatureStack, config: &ExportConfig) -> ChangeResult<()>;
}

/// Validate then hand the stack to `exporter`
pub fn export_stack<E: StackExporter>(exporter: &E, stack: &FeatureStack, config: &ExportConfig) -> ChangeResult<()> {
    config.validate(stack)?;
    log::info!("Exporting {} bands as {:?} to {}/{} at {} m ({})",
               stack.band_count(), config.file_format, config.folder,
               config.file_name_prefix, config.scale, config.crs);
    exporter.export(stack, config)
}
