use crate::classify::{BinStatus, ClassificationResult};
use crate::utils::error::DetectorError;
use crate::Result;
use ab_glyph::{FontArc, FontRef, FontVec, PxScale};
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::io::Cursor;
use std::path::Path;

// 标注样式常量
const BOX_THICKNESS: i32 = 3;
const LABEL_FONT_SIZE: f32 = 22.0;
const LABEL_TAB_HEIGHT: u32 = 28;
const LABEL_TAB_MIN_WIDTH: u32 = 120;
const LABEL_PADDING: i32 = 4;
const FULL_COLOR: [u8; 3] = [239, 68, 68];
const OTHER_COLOR: [u8; 3] = [16, 185, 129];
const TEXT_COLOR: [u8; 3] = [255, 255, 255];

// 内置标签字体 (DejaVu Sans Bold)
static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

/// 在图像上绘制主检测框与状态标签
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    /// 使用内置字体
    pub fn new() -> Self {
        let font = match FontRef::try_from_slice(DEFAULT_FONT) {
            Ok(font) => Some(FontArc::new(font)),
            Err(e) => {
                tracing::warn!("Embedded label font unusable, labels will be drawn without text: {}", e);
                None
            }
        };
        Self { font }
    }

    /// 从 TTF/OTF 文件加载标签字体，替换内置字体
    pub fn with_font_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            DetectorError::Config(format!("Invalid label font {}: {}", path.display(), e))
        })?;
        Ok(Self { font: Some(FontArc::new(font)) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 绘制标注；无检测时返回 `None`
    pub fn annotate(&self, image: &DynamicImage, result: &ClassificationResult) -> Option<RgbImage> {
        let bbox = result.bounding_box?;
        let mut canvas = image.to_rgb8();
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        if w == 0 || h == 0 {
            return None;
        }

        let color = Rgb(match result.status {
            BinStatus::Full => FULL_COLOR,
            _ => OTHER_COLOR,
        });

        let x1 = (bbox.x1.floor() as i32).clamp(0, w - 1);
        let y1 = (bbox.y1.floor() as i32).clamp(0, h - 1);
        let x2 = (bbox.x2.ceil() as i32).clamp(0, w - 1);
        let y2 = (bbox.y2.ceil() as i32).clamp(0, h - 1);
        if x1 >= x2 || y1 >= y2 {
            return Some(canvas);
        }

        // 边框加粗
        for t in 0..BOX_THICKNESS {
            let bw = x2 - x1 - 2 * t;
            let bh = y2 - y1 - 2 * t;
            if bw <= 0 || bh <= 0 {
                break;
            }
            let rect = Rect::at(x1 + t, y1 + t).of_size(bw as u32 + 1, bh as u32 + 1);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }

        let label = format!("{} {:.1}%", result.status.as_str(), result.confidence * 100.0);
        let scale = PxScale::from(LABEL_FONT_SIZE);
        let tab_width = match &self.font {
            Some(font) => text_size(scale, font, &label).0 + 2 * LABEL_PADDING as u32,
            None => LABEL_TAB_MIN_WIDTH,
        };

        // 标签放在框上方，空间不足时放在框内
        let tab_y = if y1 >= LABEL_TAB_HEIGHT as i32 { y1 - LABEL_TAB_HEIGHT as i32 } else { y1 };
        draw_filled_rect_mut(&mut canvas, Rect::at(x1, tab_y).of_size(tab_width, LABEL_TAB_HEIGHT), color);

        if let Some(font) = &self.font {
            draw_text_mut(
                &mut canvas,
                Rgb(TEXT_COLOR),
                x1 + LABEL_PADDING,
                tab_y + LABEL_PADDING / 2,
                scale,
                font,
                &label,
            );
        }

        Some(canvas)
    }

    /// PNG 编码
    pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| DetectorError::Internal(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer.into_inner())
    }

    /// PNG 编码后转为 base64
    pub fn encode_png_base64(image: &RgbImage) -> Result<String> {
        let png = Self::encode_png(image)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}
