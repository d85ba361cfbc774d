use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// 填充颜色（与 Ultralytics 一致）
const PAD_VALUE: u8 = 114;

/// letterbox 变换参数，用于把网络坐标还原到原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    /// 网络输入坐标 -> 原图坐标
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 等比缩放并居中填充到目标尺寸，输出 NCHW、[0,1] 的张量
    pub fn letterbox(image: &DynamicImage, target: (u32, u32)) -> (Array4<f32>, Letterbox) {
        let (target_h, target_w) = target;
        let (orig_w, orig_h) = image.dimensions();

        let scale = (target_h as f32 / orig_h as f32).min(target_w as f32 / orig_w as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_w);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_h);

        let pad_x = (target_w - new_w) / 2;
        let pad_y = (target_h - new_h) / 2;

        let resized = image::imageops::resize(&image.to_rgb8(), new_w, new_h, FilterType::Triangle);

        let mut canvas = RgbImage::from_pixel(target_w, target_h, Rgb([PAD_VALUE; 3]));
        image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

        let mut tensor = Array4::<f32>::zeros((1, 3, target_h as usize, target_w as usize));
        for (x, y, pixel) in canvas.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        let letterbox = Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            orig_width: orig_w,
            orig_height: orig_h,
        };

        (tensor, letterbox)
    }
}
