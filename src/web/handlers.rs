use crate::{
    classify::{ClassificationPipeline, ClassifyOptions, PredictResponse},
    models::ModelStats,
    stats::{AnalysisRecord, StatsSnapshot},
    utils::error::DetectorError,
    web::{extractors::PredictUpload, extractors::RequestId, AppState},
    Result,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

/// 服务信息
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "application": "Smart Bin Detector",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "model": "YOLOv9",
        "endpoints": {
            "health": "/health - Server health check",
            "predict": "/predict - Image classification (POST)",
            "info": "/model-info - Model information",
            "download": "/download-model - Download the model artifact",
            "stats": "/stats - Analysis statistics",
            "dashboard": "/dashboard - Web dashboard"
        }
    }))
}

/// 健康检查端点
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let model_path = state.models.model_path().map(|p| p.display().to_string());

    Json(json!({
        "status": "healthy",
        "model_loaded": true,
        "model_path": model_path,
        "timestamp": chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
    }))
}

/// 图片分类
pub async fn predict_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    upload: PredictUpload,
) -> Result<Json<PredictResponse>> {
    tracing::info!(
        "Processing predict request: request_id={}, file={:?}, content_type={}",
        request_id,
        upload.filename,
        upload.content_type
    );

    let options = ClassifyOptions {
        confidence_threshold: upload.confidence.unwrap_or(state.config.default_confidence),
        annotate: upload.annotate,
    };

    // 推理是同步阻塞的，放到阻塞线程池
    let models = Arc::clone(&state.models);
    let PredictUpload { data, filename, .. } = upload;
    let prediction = tokio::task::spawn_blocking(move || {
        let model = models.model();
        ClassificationPipeline::process_bytes(model.as_ref(), models.annotator(), &data, filename, options)
    })
    .await
    .map_err(|e| DetectorError::Internal(format!("Inference task failed: {}", e)))??;

    state.stats.record(AnalysisRecord::from_response(&prediction.response));

    tracing::info!(
        "Predict completed: request_id={}, status={}, time={:.3}s",
        request_id,
        prediction.response.status,
        prediction.response.processing_time
    );

    Ok(Json(prediction.response))
}

/// 模型信息
pub async fn model_info_handler(State(state): State<AppState>) -> Json<ModelStats> {
    Json(state.models.get_stats())
}

/// 下载模型文件
pub async fn download_model_handler(State(state): State<AppState>) -> Result<Response> {
    let path = match state.models.model_path() {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => return Err(DetectorError::ModelNotFound(path.display().to_string())),
        None => return Err(DetectorError::ModelNotFound("no model artifact path".to_string())),
    };

    tracing::info!("Downloading model: {}", path.display());

    let file = tokio::fs::File::open(&path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "best.onnx".to_string());
    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", filename))
        .map_err(|e| DetectorError::Internal(e.to_string()))?;

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// 统计快照
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// 导出统计为 stats.json
pub async fn stats_export_handler(State(state): State<AppState>) -> Result<Response> {
    let body = serde_json::to_string_pretty(&state.stats.export())?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=stats.json"),
        ],
        body,
    )
        .into_response())
}

/// 清空历史
pub async fn clear_history_handler(State(state): State<AppState>) -> Json<Value> {
    state.stats.clear_history();
    Json(json!({ "success": true, "message": "History cleared" }))
}
