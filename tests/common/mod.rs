#![allow(dead_code)]

use std::path::Path;

use bgstatus::overlay::Typeface;
use image::{ImageFormat, Rgba, RgbaImage};

/// Fixed-advance face that paints one solid cell per character.
pub struct BlockFace;

impl Typeface for BlockFace {
    fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * 0.6
    }

    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: Rgba<u8>,
    ) {
        let right = (x + self.measure(text, size)) as u32;
        let top = (baseline - size).max(0.0) as u32;
        for py in top..baseline as u32 {
            for px in x as u32..right {
                if px < canvas.width() && py < canvas.height() {
                    canvas.put_pixel(px, py, color);
                }
            }
        }
    }
}

pub fn write_png(path: &Path, width: u32, height: u32, value: u8) {
    RgbaImage::from_fn(width, height, |x, _| {
        Rgba([value, value.wrapping_add((x % 7) as u8), value, 255])
    })
    .save_with_format(path, ImageFormat::Png)
    .unwrap();
}

pub fn outputs(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.starts_with("loginscreen_") && name.ends_with(".jpg"))
        .collect();
    names.sort();
    names
}
