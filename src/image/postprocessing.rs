use crate::image::Letterbox;
use crate::models::BoundingBox;
use crate::utils::error::DetectorError;
use crate::Result;
use ndarray::{ArrayViewD, Axis, Ix2};

/// 解码后、NMS 之前的候选框
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub score: f32,
    pub bbox: BoundingBox,
}

/// 由检测头的静态输出形状推断类别数
///
/// 动态维度为 -1；两维都已知时较小的一维是 `4 + nc`。
pub fn num_classes_from_output_shape(dims: &[i64]) -> Option<usize> {
    let [_, a, b] = dims else { return None };
    let features = match (*a > 0, *b > 0) {
        (true, true) => (*a).min(*b),
        (true, false) => *a,
        (false, true) => *b,
        (false, false) => return None,
    };
    (features > 4).then(|| (features - 4) as usize)
}

/// 解码 YOLO 检测头输出
///
/// 支持 `[1, 4 + nc, anchors]`（Ultralytics 默认导出）与转置后的
/// `[1, anchors, 4 + nc]`。`num_classes` 为 0 时按较小的维度推断。
pub fn decode_predictions(
    prediction: &ArrayViewD<f32>,
    num_classes: usize,
    confidence_threshold: f32,
    letterbox: &Letterbox,
) -> Result<Vec<Candidate>> {
    let shape = prediction.shape();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectorError::Inference(format!(
            "Unsupported detection output shape: {:?}. Expected (1, 4 + classes, anchors)",
            shape
        )));
    }

    let (dim_a, dim_b) = (shape[1], shape[2]);
    let channels_first = if num_classes > 0 {
        if dim_a == 4 + num_classes {
            true
        } else if dim_b == 4 + num_classes {
            false
        } else {
            return Err(DetectorError::Inference(format!(
                "Output shape {:?} does not match {} classes",
                shape, num_classes
            )));
        }
    } else {
        dim_a <= dim_b
    };

    let matrix = prediction
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|e| DetectorError::Inference(e.to_string()))?;
    // 统一为 (channels, anchors)
    let matrix = if channels_first { matrix } else { matrix.reversed_axes() };

    let channels = matrix.nrows();
    if channels <= 4 {
        return Err(DetectorError::Inference(format!(
            "Detection output has no class scores: {:?}",
            shape
        )));
    }

    let orig_w = letterbox.orig_width as f32;
    let orig_h = letterbox.orig_height as f32;
    let mut candidates = Vec::new();

    for anchor in 0..matrix.ncols() {
        let column = matrix.column(anchor);

        // 取最高类别分数
        let mut class_id = 0usize;
        let mut score = f32::MIN;
        for c in 4..channels {
            if column[c] > score {
                score = column[c];
                class_id = c - 4;
            }
        }

        if score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);
        let (x1, y1) = letterbox.to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_original(cx + w / 2.0, cy + h / 2.0);
        let bbox = BoundingBox::new(x1, y1, x2, y2).clamp(orig_w, orig_h);

        if bbox.area() <= 0.0 {
            continue;
        }

        candidates.push(Candidate { class_id, score, bbox });
    }

    Ok(candidates)
}

/// 按类别做非极大值抑制，结果按置信度降序
///
/// 排序是稳定的，分数相同的候选保留原有顺序。
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32, max_detections: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn identity_letterbox(width: u32, height: u32) -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_width: width,
            orig_height: height,
        }
    }

    /// 构造 (1, 4 + nc, anchors) 输出
    fn output(anchors: &[([f32; 4], Vec<f32>)]) -> Array3<f32> {
        let nc = anchors[0].1.len();
        let mut out = Array3::<f32>::zeros((1, 4 + nc, anchors.len()));
        for (i, (bbox, scores)) in anchors.iter().enumerate() {
            for k in 0..4 {
                out[[0, k, i]] = bbox[k];
            }
            for (c, s) in scores.iter().enumerate() {
                out[[0, 4 + c, i]] = *s;
            }
        }
        out
    }

    #[test]
    fn keeps_anchors_above_threshold() {
        let out = output(&[
            ([30.0, 30.0, 40.0, 40.0], vec![0.81, 0.10]),
            ([60.0, 60.0, 10.0, 10.0], vec![0.05, 0.20]),
        ]);
        let candidates =
            decode_predictions(&out.view().into_dyn(), 2, 0.25, &identity_letterbox(100, 100)).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].class_id, 0);
        assert!((candidates[0].score - 0.81).abs() < 1e-6);
        assert_eq!(candidates[0].bbox, BoundingBox::new(10.0, 10.0, 50.0, 50.0));
    }

    #[test]
    fn undoes_letterbox_padding() {
        let out = output(&[([32.0, 42.0, 20.0, 20.0], vec![0.9])]);
        let letterbox = Letterbox {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 10.0,
            orig_width: 128,
            orig_height: 88,
        };
        let candidates = decode_predictions(&out.view().into_dyn(), 1, 0.25, &letterbox).unwrap();

        assert_eq!(candidates[0].bbox, BoundingBox::new(44.0, 44.0, 84.0, 84.0));
    }

    #[test]
    fn accepts_transposed_layout() {
        let mut out = Array3::<f32>::zeros((1, 3, 6));
        let row = [50.0, 50.0, 20.0, 20.0, 0.1, 0.7];
        for (k, v) in row.iter().enumerate() {
            out[[0, 1, k]] = *v;
        }
        let candidates =
            decode_predictions(&out.view().into_dyn(), 2, 0.25, &identity_letterbox(100, 100)).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].class_id, 1);
    }

    #[test]
    fn rejects_unexpected_rank() {
        let out = ndarray::Array2::<f32>::zeros((6, 10));
        let err = decode_predictions(&out.view().into_dyn(), 2, 0.25, &identity_letterbox(10, 10)).unwrap_err();
        assert!(matches!(err, DetectorError::Inference(_)));
    }

    #[test]
    fn nms_suppresses_same_class_overlaps_only() {
        let a = Candidate { class_id: 0, score: 0.9, bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0) };
        let b = Candidate { class_id: 0, score: 0.8, bbox: BoundingBox::new(0.5, 0.5, 10.0, 10.0) };
        let c = Candidate { class_id: 1, score: 0.7, bbox: BoundingBox::new(0.5, 0.5, 10.0, 10.0) };

        let kept = non_max_suppression(vec![b, c.clone(), a.clone()], 0.7, 300);

        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn nms_respects_max_detections() {
        let candidates = (0..5)
            .map(|i| Candidate {
                class_id: 0,
                score: 0.5 + i as f32 * 0.05,
                bbox: BoundingBox::new(i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0),
            })
            .collect();

        let kept = non_max_suppression(candidates, 0.7, 2);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].score > kept[1].score);
    }

    #[test]
    fn class_count_from_output_shape() {
        assert_eq!(num_classes_from_output_shape(&[1, 6, 8400]), Some(2));
        assert_eq!(num_classes_from_output_shape(&[1, 8400, 6]), Some(2));
        assert_eq!(num_classes_from_output_shape(&[1, 6, -1]), Some(2));
        assert_eq!(num_classes_from_output_shape(&[1, -1, -1]), None);
        assert_eq!(num_classes_from_output_shape(&[1, 4, 8400]), None);
        assert_eq!(num_classes_from_output_shape(&[6, 8400]), None);
    }
}
