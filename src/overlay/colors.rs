//! Adaptive panel color schemes.

use image::{Rgba, RgbaImage};

use super::brightness::{self, Region};
use super::render::Rect;

/// Text, background, and border colors of one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextColor {
    pub text: Rgba<u8>,
    pub background: Rgba<u8>,
    pub border: Rgba<u8>,
}

impl TextColor {
    /// White text on a translucent black box, for dark backgrounds.
    pub const LIGHT_ON_DARK: TextColor = TextColor {
        text: Rgba([255, 255, 255, 255]),
        background: Rgba([0, 0, 0, 160]),
        border: Rgba([255, 255, 255, 80]),
    };

    /// Black text on a translucent white box, for light backgrounds.
    pub const DARK_ON_LIGHT: TextColor = TextColor {
        text: Rgba([0, 0, 0, 255]),
        background: Rgba([255, 255, 255, 180]),
        border: Rgba([0, 0, 0, 80]),
    };

    /// Pick the scheme that contrasts with the area a panel will cover.
    pub fn for_region(img: &RgbaImage, rect: &Rect) -> TextColor {
        let region = Region::new(
            rect.x as i64,
            rect.y as i64,
            rect.width as i64,
            rect.height as i64,
        );
        if brightness::is_light(img, region) {
            TextColor::DARK_ON_LIGHT
        } else {
            TextColor::LIGHT_ON_DARK
        }
    }
}
