pub mod config;
pub mod models;
pub mod image;
pub mod classify;
pub mod stats;
pub mod web;
pub mod utils;

// 重新导出主要类型
pub use classify::{BinStatus, ClassificationResult};
pub use config::Config;
pub use utils::error::DetectorError;

pub type Result<T> = std::result::Result<T, DetectorError>;
