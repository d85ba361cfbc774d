use crate::utils::error::DetectorError;
use crate::Result;
use std::path::PathBuf;

/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// 默认模型搜索路径（按顺序尝试）
pub const DEFAULT_MODEL_PATHS: [&str; 6] = [
    "best.onnx",
    "../best.onnx",
    "../../best.onnx",
    "../../../best.onnx",
    "backend/best.onnx",
    "runs/detect/train/weights/best.onnx",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件候选路径
    pub model_paths: Vec<PathBuf>,

    /// 标注字体文件（可选）
    pub label_font: Option<PathBuf>,

    /// 默认置信度阈值
    pub default_confidence: f32,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// NMS IoU 阈值
    pub iou_threshold: f32,

    /// 单张图片最大检测数
    pub max_detections: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        model_paths: Vec<PathBuf>,
        label_font: Option<PathBuf>,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);
        if workers == 0 {
            return Err(DetectorError::Config("workers must be at least 1".to_string()));
        }

        let model_paths = if model_paths.is_empty() {
            DEFAULT_MODEL_PATHS.iter().map(PathBuf::from).collect()
        } else {
            model_paths
        };

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            iou_threshold: 0.7,
            max_detections: 300,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 50 * 1024 * 1024, // 50MB
        };

        Ok(Self {
            bind_addr,
            model_paths,
            label_font,
            default_confidence: DEFAULT_CONFIDENCE,
            workers,
            dev_mode,
            onnx_config,
            server_config,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            model_paths: DEFAULT_MODEL_PATHS.iter().map(PathBuf::from).collect(),
            label_font: None,
            default_confidence: DEFAULT_CONFIDENCE,
            workers: 1,
            dev_mode: false,
            onnx_config: OnnxConfig {
                intra_threads: 1,
                iou_threshold: 0.7,
                max_detections: 300,
            },
            server_config: ServerConfig {
                request_timeout: 60,
                max_request_size: 50 * 1024 * 1024,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_list_falls_back_to_defaults() {
        let config = Config::new("127.0.0.1:0".into(), Vec::new(), None, Some(2), false).unwrap();
        assert_eq!(config.model_paths.len(), DEFAULT_MODEL_PATHS.len());
        assert_eq!(config.model_paths[0], PathBuf::from("best.onnx"));
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn explicit_model_paths_replace_defaults() {
        let config = Config::new(
            "127.0.0.1:0".into(),
            vec![PathBuf::from("/opt/models/bins.onnx")],
            None,
            None,
            true,
        )
        .unwrap();
        assert_eq!(config.model_paths, vec![PathBuf::from("/opt/models/bins.onnx")]);
        assert_eq!(config.server_config.request_timeout, 300);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = Config::new("127.0.0.1:0".into(), Vec::new(), None, Some(0), false).unwrap_err();
        assert!(matches!(err, DetectorError::Config(_)));
    }
}
