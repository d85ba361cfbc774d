pub mod types;
pub mod classifier;
pub mod pipeline;

pub use types::{
    BinStatus, ClassificationResult, ClassifyOptions, ImageInfo, PredictResponse, StatusPresentation,
};
pub use classifier::{classify, classify_bytes, classify_detections, status_for_class, validate_threshold};
pub use pipeline::ClassificationPipeline;
