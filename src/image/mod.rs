pub mod loader;
pub mod preprocessing;
pub mod postprocessing;
pub mod annotate;

pub use loader::{DecodedImage, ImageLoader};
pub use preprocessing::{ImagePreprocessor, Letterbox};
pub use annotate::Annotator;
