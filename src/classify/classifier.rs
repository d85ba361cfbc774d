use crate::classify::{BinStatus, ClassificationResult};
use crate::image::ImageLoader;
use crate::models::{DetectionModel, Detection};
use crate::utils::error::DetectorError;
use crate::Result;
use image::DynamicImage;

const FULL_MARKERS: [&str; 2] = ["pleine", "full"];
const EMPTY_MARKERS: [&str; 2] = ["vide", "empty"];

/// 类别名 -> 状态（不区分大小写的子串匹配）
pub fn status_for_class(class_name: &str) -> BinStatus {
    let name = class_name.to_lowercase();

    if FULL_MARKERS.iter().any(|m| name.contains(m)) {
        BinStatus::Full
    } else if EMPTY_MARKERS.iter().any(|m| name.contains(m)) {
        BinStatus::Empty
    } else {
        BinStatus::Unknown
    }
}

/// 从一次推理的全部检测中得出结论
///
/// 取置信度最高的检测；并列时取最先出现的那个。
pub fn classify_detections(detections: &[Detection]) -> ClassificationResult {
    let mut best: Option<&Detection> = None;
    for detection in detections {
        match best {
            Some(current) if detection.confidence <= current.confidence => {}
            _ => best = Some(detection),
        }
    }

    let Some(best) = best else {
        return ClassificationResult::no_detection();
    };

    ClassificationResult {
        status: status_for_class(&best.class_name),
        confidence: best.confidence,
        class_name: Some(best.class_name.clone()),
        class_id: Some(best.class_id),
        detection_count: detections.len(),
        bounding_box: Some(best.bbox),
    }
}

/// 校验置信度阈值，必须在 (0, 1) 内
pub fn validate_threshold(confidence_threshold: f32) -> Result<f32> {
    if confidence_threshold > 0.0 && confidence_threshold < 1.0 {
        Ok(confidence_threshold)
    } else {
        Err(DetectorError::InvalidInput(format!(
            "Confidence threshold must be within (0, 1), got {}",
            confidence_threshold
        )))
    }
}

/// 对一张已解码图片运行模型并分类
pub fn classify(
    model: &dyn DetectionModel,
    image: &DynamicImage,
    confidence_threshold: f32,
) -> Result<ClassificationResult> {
    let threshold = validate_threshold(confidence_threshold)?;

    let detections = model.detect(image, threshold).map_err(|e| match e {
        DetectorError::Inference(_) => e,
        other => DetectorError::Inference(other.to_string()),
    })?;

    let result = classify_detections(&detections);
    tracing::debug!(
        "Classified image: status={}, confidence={:.3}, detections={}",
        result.status,
        result.confidence,
        result.detection_count
    );

    Ok(result)
}

/// 解码原始字节后分类
pub fn classify_bytes(
    model: &dyn DetectionModel,
    bytes: &[u8],
    confidence_threshold: f32,
) -> Result<ClassificationResult> {
    let decoded = ImageLoader::from_bytes(bytes)?;
    classify(model, &decoded.image, confidence_threshold)
}
