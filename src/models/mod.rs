pub mod detection;
pub mod detector;
pub mod metadata;
pub mod locator;
pub mod manager;

pub use detection::{BoundingBox, Detection};
pub use detector::{DetectionModel, YoloDetector};
pub use metadata::ModelMetadata;
pub use locator::{
    load_model, LoadedModel, ModelLoader, ModelLocator, OnnxModelLoader, SearchPathLocator,
    StaticLocator,
};
pub use manager::{ModelManager, ModelStats};
