use crate::{
    classify::{classify, validate_threshold, ClassificationResult, ClassifyOptions, ImageInfo, PredictResponse},
    image::{Annotator, ImageLoader},
    models::DetectionModel,
    Result,
};
use image::RgbImage;
use std::time::Instant;

/// 一次完整预测的产物
#[derive(Debug, Clone)]
pub struct Prediction {
    pub result: ClassificationResult,
    pub response: PredictResponse,
    pub annotated: Option<RgbImage>,
}

/// 分类处理流水线：解码 -> 推理 -> 结论 -> 标注
pub struct ClassificationPipeline;

impl ClassificationPipeline {
    /// 处理上传的图片字节
    pub fn process_bytes(
        model: &dyn DetectionModel,
        annotator: &Annotator,
        bytes: &[u8],
        filename: Option<String>,
        options: ClassifyOptions,
    ) -> Result<Prediction> {
        let threshold = validate_threshold(options.confidence_threshold)?;
        let start_time = Instant::now();

        let decoded = ImageLoader::from_bytes(bytes)?;
        tracing::info!(
            "Analysing {} ({}x{}, {})",
            filename.as_deref().unwrap_or("<unnamed>"),
            decoded.width(),
            decoded.height(),
            decoded.format_name()
        );

        let result = classify(model, &decoded.image, threshold)?;
        let processing_time = start_time.elapsed();

        let annotated = if options.annotate {
            annotator.annotate(&decoded.image, &result)
        } else {
            None
        };
        let annotated_image = match &annotated {
            Some(image) => Some(Annotator::encode_png_base64(image)?),
            None => None,
        };

        let image_info = ImageInfo {
            width: decoded.width(),
            height: decoded.height(),
            format: decoded.format_name(),
            filename,
        };

        let response = PredictResponse::new(
            &result,
            processing_time.as_secs_f64(),
            image_info,
            annotated_image,
        );

        match result.status {
            crate::classify::BinStatus::NoDetection => tracing::warn!("No bin detected"),
            status => tracing::info!(
                "Result: {} ({:.1}%), detections={}, time={:.3}s",
                status,
                result.confidence * 100.0,
                result.detection_count,
                processing_time.as_secs_f32()
            ),
        }

        Ok(Prediction {
            result,
            response,
            annotated,
        })
    }
}
