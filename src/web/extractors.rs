use crate::utils::error::DetectorError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::request::Parts,
};

/// `/predict` 的 multipart 上传
#[derive(Debug)]
pub struct PredictUpload {
    pub data: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
    pub confidence: Option<f32>,
    pub annotate: bool,
}

#[async_trait]
impl<S> FromRequest<S> for PredictUpload
where
    S: Send + Sync,
{
    type Rejection = DetectorError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| DetectorError::InvalidInput(format!("Expected multipart form data: {}", e)))?;

        let mut file: Option<(Bytes, String, Option<String>)> = None;
        let mut confidence = None;
        let mut annotate = false;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| DetectorError::InvalidInput(format!("Failed to read multipart field: {}", e)))?
        {
            let field_name = field.name().unwrap_or("unknown").to_string();

            match field_name.as_str() {
                "file" => {
                    // 验证内容类型
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    if !content_type.starts_with("image/") {
                        return Err(DetectorError::InvalidInput(
                            "The file must be an image (JPG, PNG, JPEG)".to_string(),
                        ));
                    }

                    let filename = field.file_name().map(|s| s.to_string());
                    let data = field.bytes().await.map_err(|e| {
                        DetectorError::InvalidInput(format!("Failed to read file data: {}", e))
                    })?;

                    tracing::debug!("Received file: {:?}, {} bytes", filename, data.len());
                    file = Some((data, content_type, filename));
                }
                "confidence" => {
                    let value = field.text().await.unwrap_or_default();
                    let parsed = value.trim().parse::<f32>().map_err(|_| {
                        DetectorError::InvalidInput(format!("Invalid confidence value: {}", value))
                    })?;
                    confidence = Some(parsed);
                }
                "annotate" => {
                    let value = field.text().await.unwrap_or_default();
                    annotate = matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "on" | "yes");
                }
                _ => {
                    tracing::debug!("Ignoring unknown field: {}", field_name);
                }
            }
        }

        let (data, content_type, filename) =
            file.ok_or_else(|| DetectorError::InvalidInput("No image file provided".to_string()))?;

        Ok(PredictUpload {
            data,
            content_type,
            filename,
            confidence,
            annotate,
        })
    }
}

/// 请求ID提取器
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("X-Request-ID")
            .and_then(|value| value.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(RequestId(request_id))
    }
}
