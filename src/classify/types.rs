use crate::config::DEFAULT_CONFIDENCE;
use crate::models::BoundingBox;
use serde::{Deserialize, Serialize};

/// 垃圾桶状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinStatus {
    Full,
    Empty,
    Unknown,
    NoDetection,
}

/// 状态对应的展示信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPresentation {
    pub emoji: &'static str,
    pub color: &'static str,
    pub message: &'static str,
    pub priority: &'static str,
}

impl BinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinStatus::Full => "FULL",
            BinStatus::Empty => "EMPTY",
            BinStatus::Unknown => "UNKNOWN",
            BinStatus::NoDetection => "NO_DETECTION",
        }
    }

    pub fn presentation(&self) -> StatusPresentation {
        match self {
            BinStatus::Full => StatusPresentation {
                emoji: "🔴",
                color: "#ef4444",
                message: "Collection required immediately",
                priority: "HIGH",
            },
            BinStatus::Empty => StatusPresentation {
                emoji: "🟢",
                color: "#10b981",
                message: "No action needed",
                priority: "LOW",
            },
            BinStatus::Unknown => StatusPresentation {
                emoji: "🟡",
                color: "#f59e0b",
                message: "Manual check recommended",
                priority: "MEDIUM",
            },
            BinStatus::NoDetection => StatusPresentation {
                emoji: "❌",
                color: "#6b7280",
                message: "No bin detected in the image",
                priority: "N/A",
            },
        }
    }
}

impl std::fmt::Display for BinStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单张图片的分类结论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: BinStatus,
    pub confidence: f32,
    pub class_name: Option<String>,
    pub class_id: Option<usize>,
    /// 模型返回的检测总数（不只是最佳检测）
    pub detection_count: usize,
    pub bounding_box: Option<BoundingBox>,
}

impl ClassificationResult {
    pub fn no_detection() -> Self {
        Self {
            status: BinStatus::NoDetection,
            confidence: 0.0,
            class_name: None,
            class_id: None,
            detection_count: 0,
            bounding_box: None,
        }
    }
}

/// 分类选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOptions {
    /// 置信度阈值，取值 (0, 1)
    pub confidence_threshold: f32,
    /// 是否返回标注图
    pub annotate: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            annotate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub filename: Option<String>,
}

/// `/predict` 的响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub status: BinStatus,
    pub emoji: String,
    pub color: String,
    pub message: String,
    pub priority: String,
    pub confidence: f32,
    pub confidence_percent: f32,
    pub class_name: Option<String>,
    pub class_id: i64,
    pub detection_count: usize,
    pub bbox: Option<BoundingBox>,
    /// 秒
    pub processing_time: f64,
    pub image_info: ImageInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
}

impl PredictResponse {
    pub fn new(
        result: &ClassificationResult,
        processing_time: f64,
        image_info: ImageInfo,
        annotated_image: Option<String>,
    ) -> Self {
        let presentation = result.status.presentation();

        Self {
            success: true,
            status: result.status,
            emoji: presentation.emoji.to_string(),
            color: presentation.color.to_string(),
            message: presentation.message.to_string(),
            priority: presentation.priority.to_string(),
            confidence: round_to(result.confidence, 4),
            confidence_percent: round_to(result.confidence * 100.0, 2),
            class_name: result.class_name.clone(),
            class_id: result.class_id.map(|id| id as i64).unwrap_or(-1),
            detection_count: result.detection_count,
            bbox: result.bounding_box.map(|b| {
                BoundingBox::new(round_to(b.x1, 2), round_to(b.y1, 2), round_to(b.x2, 2), round_to(b.y2, 2))
            }),
            processing_time: (processing_time * 1000.0).round() / 1000.0,
            image_info,
            annotated_image,
        }
    }
}

fn round_to(value: f32, places: i32) -> f32 {
    let factor = 10f32.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_in_screaming_case() {
        assert_eq!(serde_json::to_string(&BinStatus::NoDetection).unwrap(), "\"NO_DETECTION\"");
        assert_eq!(serde_json::to_string(&BinStatus::Full).unwrap(), "\"FULL\"");
    }

    #[test]
    fn response_for_no_detection() {
        let info = ImageInfo {
            width: 10,
            height: 20,
            format: "PNG".to_string(),
            filename: Some("bin.png".to_string()),
        };
        let response = PredictResponse::new(&ClassificationResult::no_detection(), 0.12345, info, None);

        assert_eq!(response.class_id, -1);
        assert_eq!(response.bbox, None);
        assert_eq!(response.priority, "N/A");
        assert_eq!(response.processing_time, 0.123);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("annotated_image").is_none());
        assert_eq!(json["status"], "NO_DETECTION");
    }

    #[test]
    fn response_rounds_confidence_and_box() {
        let result = ClassificationResult {
            status: BinStatus::Full,
            confidence: 0.812_345,
            class_name: Some("poubelle_pleine".to_string()),
            class_id: Some(0),
            detection_count: 2,
            bounding_box: Some(BoundingBox::new(10.126, 10.0, 50.0, 49.994)),
        };
        let info = ImageInfo {
            width: 64,
            height: 64,
            format: "JPEG".to_string(),
            filename: None,
        };
        let response = PredictResponse::new(&result, 0.5, info, None);

        assert!((response.confidence - 0.8123).abs() < 1e-6);
        assert!((response.confidence_percent - 81.23).abs() < 1e-3);
        assert_eq!(response.class_id, 0);
        assert_eq!(response.emoji, "🔴");
        let bbox = response.bbox.unwrap();
        assert!((bbox.x1 - 10.13).abs() < 1e-4);
        assert!((bbox.y2 - 49.99).abs() < 1e-4);
    }
}
