use crate::config::OnnxConfig;
use crate::models::{DetectionModel, YoloDetector};
use crate::utils::error::DetectorError;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 已加载的模型及其来源路径
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn DetectionModel>,
    pub path: Option<PathBuf>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_type", &self.model.model_type())
            .field("path", &self.path)
            .finish()
    }
}

/// 从单个路径加载模型
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn DetectionModel>>;
}

/// ONNX Runtime 加载器
pub struct OnnxModelLoader {
    onnx_config: OnnxConfig,
}

impl OnnxModelLoader {
    pub fn new(onnx_config: OnnxConfig) -> Self {
        Self { onnx_config }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn DetectionModel>> {
        let detector = YoloDetector::new(path, &self.onnx_config)?;
        Ok(Arc::new(detector))
    }
}

/// 模型定位策略
pub trait ModelLocator: Send + Sync {
    fn locate(&self) -> Result<LoadedModel>;
}

/// 按顺序搜索候选路径
pub struct SearchPathLocator<L> {
    paths: Vec<PathBuf>,
    loader: L,
}

impl<L: ModelLoader> SearchPathLocator<L> {
    pub fn new(paths: Vec<PathBuf>, loader: L) -> Self {
        Self { paths, loader }
    }
}

impl<L: ModelLoader> ModelLocator for SearchPathLocator<L> {
    fn locate(&self) -> Result<LoadedModel> {
        load_model(&self.paths, &self.loader)
    }
}

/// 直接返回给定模型，用于测试或嵌入场景
pub struct StaticLocator {
    loaded: LoadedModel,
}

impl StaticLocator {
    pub fn new(model: Arc<dyn DetectionModel>, path: Option<PathBuf>) -> Self {
        Self {
            loaded: LoadedModel { model, path },
        }
    }
}

impl ModelLocator for StaticLocator {
    fn locate(&self) -> Result<LoadedModel> {
        Ok(self.loaded.clone())
    }
}

/// 依次尝试候选路径，返回第一个加载成功的模型
///
/// 不存在的路径被跳过，单个路径的加载失败只记录警告；
/// 全部失败时返回 `ModelUnavailable`。
pub fn load_model(search_paths: &[PathBuf], loader: &dyn ModelLoader) -> Result<LoadedModel> {
    for path in search_paths {
        if !path.exists() {
            tracing::debug!("Model candidate missing: {}", path.display());
            continue;
        }

        match loader.load(path) {
            Ok(model) => {
                let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
                tracing::info!("Model loaded from: {}", resolved.display());
                return Ok(LoadedModel {
                    model,
                    path: Some(resolved),
                });
            }
            Err(e) => {
                tracing::warn!("Failed to load model candidate {}: {}", path.display(), e);
            }
        }
    }

    let searched = search_paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    tracing::error!("No usable model artifact found");
    Err(DetectorError::ModelUnavailable(searched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Detection;
    use image::DynamicImage;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    struct NamedModel(BTreeMap<usize, String>);

    impl DetectionModel for NamedModel {
        fn detect(&self, _image: &DynamicImage, _threshold: f32) -> Result<Vec<Detection>> {
            Ok(Vec::new())
        }

        fn class_names(&self) -> &BTreeMap<usize, String> {
            &self.0
        }

        fn input_size(&self) -> (u32, u32) {
            (640, 640)
        }
    }

    /// 文件内容为 "broken" 时加载失败
    struct RecordingLoader {
        attempts: Mutex<Vec<PathBuf>>,
    }

    impl RecordingLoader {
        fn new() -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    impl ModelLoader for RecordingLoader {
        fn load(&self, path: &Path) -> Result<Arc<dyn DetectionModel>> {
            self.attempts.lock().push(path.to_path_buf());
            let contents = std::fs::read_to_string(path)?;
            if contents == "broken" {
                return Err(DetectorError::ModelLoad("corrupt artifact".to_string()));
            }
            let mut names = BTreeMap::new();
            names.insert(0, contents);
            Ok(Arc::new(NamedModel(names)))
        }
    }

    #[test]
    fn skips_missing_and_broken_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.onnx");
        let good = dir.path().join("best.onnx");
        let later = dir.path().join("later.onnx");
        std::fs::write(&broken, "broken").unwrap();
        std::fs::write(&good, "poubelle_pleine").unwrap();
        std::fs::write(&later, "never").unwrap();

        let paths = vec![dir.path().join("missing.onnx"), broken.clone(), good.clone(), later];
        let loader = RecordingLoader::new();
        let loaded = load_model(&paths, &loader).unwrap();

        assert_eq!(loaded.model.class_names()[&0], "poubelle_pleine");
        assert_eq!(loaded.path, Some(good.canonicalize().unwrap()));
        // 缺失路径不触发加载，成功后停止搜索
        assert_eq!(*loader.attempts.lock(), vec![broken, good]);
    }

    #[test]
    fn all_candidates_failing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.onnx");
        std::fs::write(&broken, "broken").unwrap();

        let paths = vec![dir.path().join("nope.onnx"), broken];
        let err = load_model(&paths, &RecordingLoader::new()).unwrap_err();

        assert!(matches!(err, DetectorError::ModelUnavailable(_)));
        assert!(err.to_string().contains("nope.onnx"));
    }

    #[test]
    fn empty_search_list_is_fatal() {
        let err = load_model(&[], &RecordingLoader::new()).unwrap_err();
        assert!(matches!(err, DetectorError::ModelUnavailable(_)));
    }

    #[test]
    fn search_path_locator_delegates() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("best.onnx");
        std::fs::write(&good, "bin_empty").unwrap();

        let locator = SearchPathLocator::new(vec![good], RecordingLoader::new());
        let loaded = locator.locate().unwrap();
        assert_eq!(loaded.model.class_names()[&0], "bin_empty");
    }

    #[test]
    fn static_locator_returns_injected_model() {
        let locator = StaticLocator::new(Arc::new(NamedModel(BTreeMap::new())), None);
        let loaded = locator.locate().unwrap();
        assert!(loaded.path.is_none());
        assert!(loaded.model.class_names().is_empty());
    }

    #[test]
    fn onnx_loader_rejects_missing_file() {
        let loader = OnnxModelLoader::new(crate::Config::default().onnx_config);
        let err = loader.load(Path::new("/definitely/not/here.onnx")).err().unwrap();
        assert!(matches!(err, DetectorError::ModelLoad(_)));
    }
}
