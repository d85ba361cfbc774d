use crate::utils::error::DetectorError;
use crate::Result;
use image::{DynamicImage, GenericImageView, ImageFormat};

/// 上传文件大小上限
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// 解码后的图像及其来源格式
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 格式名称，未知时为 "Unknown"
    pub fn format_name(&self) -> String {
        match self.format {
            Some(format) => format!("{:?}", format).to_uppercase(),
            None => "Unknown".to_string(),
        }
    }
}

pub struct ImageLoader;

impl ImageLoader {
    /// 从字节流加载图像，统一转换为RGB
    pub fn from_bytes(bytes: &[u8]) -> Result<DecodedImage> {
        if bytes.is_empty() {
            return Err(DetectorError::InvalidImage("Empty image data".to_string()));
        }

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(DetectorError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        let format = Self::detect_format(bytes);
        let image = image::load_from_memory(bytes)
            .map_err(|e| DetectorError::InvalidImage(e.to_string()))?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::InvalidImage(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        Ok(DecodedImage {
            image: DynamicImage::ImageRgb8(image.to_rgb8()),
            format,
        })
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }
}
