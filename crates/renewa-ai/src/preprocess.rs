//! Image → input tensor conversion for CNN classifiers.

use image::DynamicImage;
use image::imageops::FilterType;

/// ImageNet normalization mean values (RGB).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Spatial size the model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGeometry {
    pub width: u32,
    pub height: u32,
}

impl Default for InputGeometry {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
        }
    }
}

impl InputGeometry {
    /// NCHW tensor shape for a batch of one.
    pub fn shape(&self) -> [i64; 4] {
        [1, 3, self.height as i64, self.width as i64]
    }

    pub fn len(&self) -> usize {
        3 * self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resize, normalize and flatten `image` to CHW layout.
pub fn to_chw(image: &DynamicImage, geometry: InputGeometry) -> Vec<f32> {
    let resized = image.resize_exact(geometry.width, geometry.height, FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let plane = (geometry.width * geometry.height) as usize;

    let mut out = vec![0.0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            // All R values, then all G, then all B.
            out[c * plane + i] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    out
}
