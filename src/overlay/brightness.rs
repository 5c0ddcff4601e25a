//! Region luminance sampling.

use image::RgbaImage;

/// Sample every Nth pixel on both axes.
const SAMPLE_STRIDE: usize = 4;
/// Average luminance above which a region counts as light.
const LIGHT_THRESHOLD: f64 = 128.0;

/// Rectangle in signed pixel coordinates; may extend past the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Region {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with `width` x `height`, returning `(x0, y0, x1, y1)` or
    /// `None` when nothing remains.
    fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.width).min(i64::from(width));
        let y1 = self.y.saturating_add(self.height).min(i64::from(height));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Rec. 601 luma of an 8-bit pixel.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Average sampled luminance of `region`, or `None` when the region has no
/// pixels inside the image.
pub fn average_luminance(img: &RgbaImage, region: Region) -> Option<f64> {
    let (x0, y0, x1, y1) = region.clamp_to(img.width(), img.height())?;
    let mut total = 0.0;
    let mut count = 0usize;
    for y in (y0..y1).step_by(SAMPLE_STRIDE) {
        for x in (x0..x1).step_by(SAMPLE_STRIDE) {
            let [r, g, b, _] = img.get_pixel(x, y).0;
            total += luminance(r, g, b);
            count += 1;
        }
    }
    (count > 0).then(|| total / count as f64)
}

/// Classify a region as light. Empty or out-of-bounds regions are dark.
pub fn is_light(img: &RgbaImage, region: Region) -> bool {
    average_luminance(img, region).is_some_and(|avg| avg > LIGHT_THRESHOLD)
}
