//! Resolution-proportional panel metrics.
//!
//! All metrics are designed against a 1920x1080 reference and scaled by the
//! smaller axis ratio, clamped so text stays readable on small displays and
//! compact on large ones.

pub const REFERENCE_WIDTH: f32 = 1920.0;
pub const REFERENCE_HEIGHT: f32 = 1080.0;

pub const BASE_FONT_SIZE: f32 = 18.0;
pub const BASE_PADDING: f32 = 20.0;
pub const BASE_LINE_SPACING: f32 = 6.0;
pub const BASE_CORNER_RADIUS: f32 = 10.0;
pub const BASE_MARGIN_LEFT: f32 = 40.0;
pub const BASE_MARGIN_RIGHT: f32 = 40.0;
pub const BASE_MARGIN_TOP: f32 = 80.0;

pub const MIN_SCALE_FACTOR: f32 = 0.6;
/// At 1.0, text on 4K displays stays the size it is on 1080p.
pub const MAX_SCALE_FACTOR: f32 = 1.0;
pub const MIN_FONT_SIZE: f32 = 12.0;

/// Pixel metrics for one render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledDimensions {
    pub font_size: f32,
    pub padding: f32,
    pub line_spacing: f32,
    pub corner_radius: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub scale_factor: f32,
}

impl ScaledDimensions {
    /// Metrics for a target of `width` x `height` pixels.
    pub fn for_resolution(width: u32, height: u32) -> Self {
        let scale_x = width as f32 / REFERENCE_WIDTH;
        let scale_y = height as f32 / REFERENCE_HEIGHT;
        let scale = scale_x
            .min(scale_y)
            .clamp(MIN_SCALE_FACTOR, MAX_SCALE_FACTOR);

        Self {
            font_size: (BASE_FONT_SIZE * scale).max(MIN_FONT_SIZE),
            padding: BASE_PADDING * scale,
            line_spacing: BASE_LINE_SPACING * scale,
            corner_radius: BASE_CORNER_RADIUS * scale,
            margin_left: BASE_MARGIN_LEFT * scale,
            margin_right: BASE_MARGIN_RIGHT * scale,
            margin_top: BASE_MARGIN_TOP * scale,
            scale_factor: scale,
        }
    }

    /// Rescale margins when the image differs in size from the display that
    /// will show it, so placement stays visually consistent.
    pub fn corrected_for_image(mut self, image: (u32, u32), display: (u32, u32)) -> Self {
        let (image_w, image_h) = image;
        let (display_w, display_h) = display;
        if display_w == 0 || display_h == 0 {
            return self;
        }
        let ratio_x = image_w as f32 / display_w as f32;
        let ratio_y = image_h as f32 / display_h as f32;
        self.margin_left *= ratio_x;
        self.margin_right *= ratio_x;
        self.margin_top *= ratio_y;
        self
    }

    pub fn line_height(&self) -> f32 {
        self.font_size + self.line_spacing
    }

    /// Box height for `lines` lines of text, padding included.
    pub fn box_height(&self, lines: usize) -> f32 {
        self.line_height() * lines as f32 - self.line_spacing + self.padding * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn reference_resolution_is_unscaled() {
        let dims = ScaledDimensions::for_resolution(1920, 1080);
        assert!(close(dims.scale_factor, 1.0));
        assert!(close(dims.font_size, 18.0));
        assert!(close(dims.padding, 20.0));
        assert!(close(dims.line_spacing, 6.0));
        assert!(close(dims.corner_radius, 10.0));
        assert!(close(dims.margin_left, 40.0));
        assert!(close(dims.margin_right, 40.0));
        assert!(close(dims.margin_top, 80.0));
    }

    #[test]
    fn small_display_clamps_to_minimum_scale_and_font_floor() {
        let dims = ScaledDimensions::for_resolution(1024, 768);
        assert!(close(dims.scale_factor, 0.6));
        assert!(close(dims.font_size, 12.0));
        assert!(close(dims.padding, 12.0));
        assert!(close(dims.margin_top, 48.0));
    }

    #[test]
    fn large_display_caps_at_one() {
        let dims = ScaledDimensions::for_resolution(3840, 2160);
        assert!(close(dims.scale_factor, 1.0));
        assert!(close(dims.font_size, 18.0));
    }

    #[test]
    fn intermediate_resolution_scales_by_smaller_axis() {
        let dims = ScaledDimensions::for_resolution(1600, 900);
        let expected = 900.0 / 1080.0;
        assert!(close(dims.scale_factor, expected));
        assert!(close(dims.font_size, 18.0 * expected));
    }

    #[test]
    fn invariants_hold_across_resolutions() {
        for (w, h) in [
            (0, 0),
            (1, 1),
            (800, 600),
            (1280, 1024),
            (1366, 768),
            (2560, 1440),
            (7680, 4320),
            (u32::MAX, 1),
        ] {
            let dims = ScaledDimensions::for_resolution(w, h);
            assert!(
                (MIN_SCALE_FACTOR..=MAX_SCALE_FACTOR).contains(&dims.scale_factor),
                "{w}x{h} gave scale {}",
                dims.scale_factor
            );
            assert!(dims.font_size >= MIN_FONT_SIZE);
        }
    }

    #[test]
    fn margins_follow_image_to_display_ratio() {
        let dims = ScaledDimensions::for_resolution(1920, 1080)
            .corrected_for_image((3840, 2160), (1920, 1080));
        assert!(close(dims.margin_left, 80.0));
        assert!(close(dims.margin_right, 80.0));
        assert!(close(dims.margin_top, 160.0));
        assert!(close(dims.font_size, 18.0));
    }

    #[test]
    fn same_size_or_zero_display_leaves_margins() {
        let base = ScaledDimensions::for_resolution(1920, 1080);
        assert_eq!(base.corrected_for_image((1920, 1080), (1920, 1080)), base);
        assert_eq!(base.corrected_for_image((1920, 1080), (0, 1080)), base);
    }

    #[test]
    fn box_height_drops_trailing_spacing() {
        let dims = ScaledDimensions::for_resolution(1920, 1080);
        // 24 * 3 - 6 + 40
        assert!(close(dims.box_height(3), 106.0));
    }
}
