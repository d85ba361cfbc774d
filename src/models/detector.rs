use crate::config::OnnxConfig;
use crate::image::{postprocessing, ImagePreprocessor};
use crate::models::{Detection, ModelMetadata};
use crate::utils::error::DetectorError;
use crate::Result;
use image::DynamicImage;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;

/// 目标检测模型的统一接口
///
/// 实现者接收原图与置信度阈值，返回已按阈值过滤的检测结果，
/// 坐标为原图像素坐标。
pub trait DetectionModel: Send + Sync {
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>>;

    /// 类别 id -> 名称
    fn class_names(&self) -> &BTreeMap<usize, String>;

    /// 输入尺寸 (height, width)
    fn input_size(&self) -> (u32, u32);

    fn model_type(&self) -> &str {
        "YOLOv9"
    }
}

pub struct YoloDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String, // 动态发现的输出名称
    metadata: ModelMetadata,
    iou_threshold: f32,
    max_detections: usize,
}

impl YoloDetector {
    pub fn new(model_path: &Path, onnx_config: &OnnxConfig) -> Result<Self> {
        if !model_path.exists() {
            return Err(DetectorError::ModelLoad(format!(
                "Detection model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading detection model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_config.intra_threads)?
            .commit_from_file(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(DetectorError::ModelLoad(
                    "Detection model has no outputs".to_string(),
                ))
            }
        };
        tracing::info!("Detection model io: '{}' -> '{}'", input_name, output_name);

        let mut metadata = Self::read_metadata(&session);
        let output_classes = session
            .outputs
            .first()
            .and_then(|output| output.output_type.tensor_shape())
            .and_then(|dims| postprocessing::num_classes_from_output_shape(dims));
        metadata.align_with_output(output_classes);
        tracing::info!(
            "Model metadata: task={:?}, input_size={:?}, classes={:?}",
            metadata.task,
            metadata.input_size,
            metadata.names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            metadata,
            iou_threshold: onnx_config.iou_threshold,
            max_detections: onnx_config.max_detections,
        })
    }

    /// 读取 Ultralytics 写入的自定义元数据，缺失时退回默认值
    fn read_metadata(session: &Session) -> ModelMetadata {
        let model_metadata = match session.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Failed to read model metadata: {}", e);
                return ModelMetadata::default();
            }
        };

        let custom = |key: &str| model_metadata.custom(key).ok().flatten();
        let names = custom("names");
        let imgsz = custom("imgsz");
        let task = custom("task");

        ModelMetadata::from_custom(names.as_deref(), imgsz.as_deref(), task.as_deref())
    }
}

impl DetectionModel for YoloDetector {
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        let (input, letterbox) = ImagePreprocessor::letterbox(image, self.metadata.input_size);

        let input_tensor = Tensor::from_array(input)?;
        let prediction = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(DetectorError::Inference(format!(
                        "Output '{}' not found. Available outputs: {:?}",
                        self.output_name, available_outputs
                    )));
                }
            }
        };

        let num_classes = self.metadata.names.len();
        let candidates =
            postprocessing::decode_predictions(&prediction.view(), num_classes, confidence_threshold, &letterbox)?;
        let kept = postprocessing::non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        let detections = kept
            .into_iter()
            .map(|c| Detection::new(c.class_id, self.metadata.class_name(c.class_id), c.score, c.bbox))
            .collect::<Vec<_>>();

        tracing::debug!("Model returned {} detections", detections.len());
        Ok(detections)
    }

    fn class_names(&self) -> &BTreeMap<usize, String> {
        &self.metadata.names
    }

    fn input_size(&self) -> (u32, u32) {
        self.metadata.input_size
    }
}
