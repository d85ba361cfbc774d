use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("No model artifact could be loaded (searched: {0})")]
    ModelUnavailable(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model artifact not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DetectorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectorError::InvalidInput(_)
            | DetectorError::InvalidImage(_)
            | DetectorError::ImageDecode(_)
            | DetectorError::Json(_) => StatusCode::BAD_REQUEST,
            DetectorError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            DetectorError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            DetectorError::ModelUnavailable(_) | DetectorError::ModelLoad(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DetectorError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            DetectorError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            DetectorError::ModelNotFound(_) => "MODEL_NOT_FOUND",
            DetectorError::InvalidInput(_) => "INVALID_INPUT",
            DetectorError::InvalidImage(_) => "INVALID_IMAGE",
            DetectorError::Inference(_) => "INFERENCE_ERROR",
            DetectorError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            DetectorError::Config(_) => "CONFIG_ERROR",
            DetectorError::Io(_) => "IO_ERROR",
            DetectorError::Json(_) => "JSON_ERROR",
            DetectorError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            DetectorError::Ort(_) => "ORT_ERROR",
            DetectorError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for DetectorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }

        (status, axum::Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let err = DetectorError::InvalidInput("not an image".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let err = DetectorError::InvalidImage("truncated".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn inference_failure_is_a_server_error() {
        let err = DetectorError::Inference("session crashed".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "INFERENCE_ERROR");
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let err = DetectorError::ModelNotFound("best.onnx".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
