use crate::image::Annotator;
use crate::models::{DetectionModel, LoadedModel, ModelLocator};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 进程级模型句柄：启动时加载一次，之后只读共享
pub struct ModelManager {
    model: Arc<dyn DetectionModel>,
    model_path: Option<PathBuf>,
    annotator: Annotator,
}

impl ModelManager {
    /// 通过定位策略加载模型
    pub fn init(locator: &dyn ModelLocator, annotator: Annotator) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let LoadedModel { model, path } = locator.locate()?;

        tracing::info!(
            "Model manager initialized: type={}, classes={}",
            model.model_type(),
            model.class_names().len()
        );

        Ok(Self {
            model,
            model_path: path,
            annotator,
        })
    }

    /// 获取模型引用
    pub fn model(&self) -> Arc<dyn DetectionModel> {
        Arc::clone(&self.model)
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// 获取模型信息
    pub fn get_stats(&self) -> ModelStats {
        let classes = self.model.class_names().clone();
        let (input_h, input_w) = self.model.input_size();

        ModelStats {
            model_type: self.model.model_type().to_string(),
            model_path: self.model_path.as_ref().map(|p| p.display().to_string()),
            num_classes: classes.len(),
            class_list: classes.values().cloned().collect(),
            classes,
            input_size: if input_h == input_w {
                serde_json::json!(input_h)
            } else {
                serde_json::json!([input_h, input_w])
            },
            framework: "ONNX Runtime".to_string(),
            label_font: self.annotator.has_font(),
        }
    }
}

/// 模型信息
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub model_type: String,
    pub model_path: Option<String>,
    pub classes: BTreeMap<usize, String>,
    pub num_classes: usize,
    pub class_list: Vec<String>,
    pub input_size: serde_json::Value,
    pub framework: String,
    pub label_font: bool,
}
