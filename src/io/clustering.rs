//! Contract with the external clustering backend.
//!
//! Training and assignment happen outside this crate; here we only describe
//! the handoff and check what comes back.

use serde::{Deserialize, Serialize};

use crate::core::stack::FeatureStack;
use crate::types::{ChangeError, ChangeResult, LabelGrid};

/// How training pixels are drawn from the feature stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Number of pixels to sample
    pub num_pixels: usize,
    /// Sampling scale in metres
    pub scale: f64,
    /// Random seed for reproducible samples
    pub seed: u64,
    /// Tiling factor for large areas
    pub tile_scale: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_pixels: 5000,
            scale: 10.0,
            seed: 0,
            tile_scale: 16,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> ChangeResult<()> {
        if self.num_pixels == 0 {
            return Err(ChangeError::Configuration("sampling needs at least one pixel".to_string()));
        }
        if !(self.scale > 0.0) {
            return Err(ChangeError::Configuration(format!("sampling scale {} must be positive", self.scale)));
        }
        if self.tile_scale == 0 {
            return Err(ChangeError::Configuration("tile scale must be positive".to_string()));
        }
        Ok(())
    }
}

/// A trained clusterer, applied once per feature stack
pub trait ClusterModel {
    /// Number of clusters the model assigns
    fn k(&self) -> usize;

    /// Label every pixel of `stack`; pixels the model cannot label are `None`
    fn apply(&self, stack: &FeatureStack) -> ChangeResult<LabelGrid>;
}

/// Unsupervised clustering backend (train once, apply many)
pub trait ClusteringBackend {
    type Model: ClusterModel;

    fn train(&self, stack: &FeatureStack, sampling: &SamplingConfig, k: usize) -> ChangeResult<Self::Model>;
}

/// Reject label grids with values outside [0, K-1] or the wrong shape
pub fn validate_labels(labels: &LabelGrid, stack: &FeatureStack, k: usize) -> ChangeResult<()> {
    if labels.dim() != stack.geometry().dim() {
        return Err(ChangeError::GridMismatch(format!(
            "label grid {:?} vs feature stack {:?}", labels.dim(), stack.geometry().dim()
        )));
    }
    match labels.iter().flatten().find(|&&l| l as usize >= k) {
        Some(&label) => Err(ChangeError::LabelOutOfRange { label, k }),
        None => Ok(()),
    }
}

/// Train on `stack`, label it and check the result
pub fn train_and_apply<B: ClusteringBackend>(
    backend: &B,
    stack: &FeatureStack,
    sampling: &SamplingConfig,
    k: usize,
) -> ChangeResult<LabelGrid> {
    sampling.validate()?;
    if k == 0 {
        return Err(ChangeError::Configuration("cluster count K must be positive".to_string()));
    }
    log::info!("Training clusterer: K = {}, {} samples at {} m, seed {}",
               k, sampling.num_pixels, sampling.scale, sampling.seed);

    let model = backend.train(stack, sampling, k)?;
    if model.k() != k {
        return Err(ChangeError::Configuration(format!(
            "backend returned a model with K = {}, requested {}", model.k(), k
        )));
    }
    let labels = model.apply(stack)?;
    validate_labels(&labels, stack, k)?;
    Ok(labels)
}
