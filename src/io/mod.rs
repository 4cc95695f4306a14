//! Boundary contracts with the scene archive, clustering backend and export layer

pub mod scene_source;
pub mod clustering;
pub mod export;

pub use scene_source::{SceneSource, SceneQuery, InMemorySceneSource};
pub use clustering::{ClusterModel, ClusteringBackend, SamplingConfig, validate_labels, train_and_apply};
pub use export::{ExportConfig, ExportFormat, StackExporter, export_stack};
