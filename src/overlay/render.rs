//! Dual-panel compositing.

use std::path::Path;

use image::{Rgba, RgbaImage};

use super::colors::TextColor;
use super::font::{self, FontError, Typeface};
use super::layout::ScaledDimensions;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Which corner of the image a panel hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    TopRight,
}

/// Text for both panels. Either side may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelContent {
    /// Services summary, drawn top-left.
    pub left: Vec<String>,
    /// Host information, drawn top-right.
    pub right: Vec<String>,
}

/// One positioned, colored text block.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub anchor: Anchor,
    pub rect: Rect,
    pub lines: Vec<String>,
    pub colors: TextColor,
}

/// Size and place every non-empty panel and choose its colors against the
/// pixels it will cover.
pub fn layout_panels(
    source: &RgbaImage,
    content: &PanelContent,
    face: &dyn Typeface,
    dims: &ScaledDimensions,
) -> Vec<Panel> {
    let image_width = source.width() as f32;
    [
        (Anchor::TopLeft, &content.left),
        (Anchor::TopRight, &content.right),
    ]
    .into_iter()
    .filter(|(_, lines)| !lines.is_empty())
    .map(|(anchor, lines)| {
        let widest = lines
            .iter()
            .map(|line| face.measure(line, dims.font_size))
            .fold(0.0_f32, f32::max);
        let width = widest + dims.padding * 2.0;
        let height = dims.box_height(lines.len());
        let x = match anchor {
            Anchor::TopLeft => dims.margin_left,
            Anchor::TopRight => image_width - width - dims.margin_right,
        };
        let rect = Rect::new(x, dims.margin_top, width, height);
        Panel {
            anchor,
            colors: TextColor::for_region(source, &rect),
            rect,
            lines: lines.clone(),
        }
    })
    .collect()
}

/// Composite `panels` onto a copy of `source`.
pub fn render_panels(
    source: &RgbaImage,
    panels: &[Panel],
    face: &dyn Typeface,
    dims: &ScaledDimensions,
) -> RgbaImage {
    let mut canvas = source.clone();
    for panel in panels {
        draw_panel(&mut canvas, panel, face, dims);
    }
    canvas
}

/// Lay out and render the status panels with the process-wide font.
///
/// A missing or unreadable font aborts the render; there is no text-less
/// mode.
pub fn render_status_overlay(
    source: &RgbaImage,
    content: &PanelContent,
    dims: &ScaledDimensions,
    font_override: Option<&Path>,
) -> Result<RgbaImage, FontError> {
    let face = font::shared(font_override)?;
    let panels = layout_panels(source, content, face, dims);
    Ok(render_panels(source, &panels, face, dims))
}

fn draw_panel(
    canvas: &mut RgbaImage,
    panel: &Panel,
    face: &dyn Typeface,
    dims: &ScaledDimensions,
) {
    let rect = panel.rect;
    let radius = dims.corner_radius;
    fill_rounded_rect(canvas, &rect, radius, panel.colors.background);
    stroke_rounded_rect(canvas, &rect, radius, panel.colors.border);

    let text_x = rect.x + dims.padding;
    let mut baseline = rect.y + dims.padding + dims.font_size;
    for line in &panel.lines {
        face.draw(
            canvas,
            line,
            text_x,
            baseline,
            dims.font_size,
            panel.colors.text,
        );
        baseline += dims.line_height();
    }
}

/// Source-over blend of `color` at `coverage` (0..=1) into one pixel.
/// Out-of-bounds coordinates are ignored.
pub(crate) fn blend_pixel(
    canvas: &mut RgbaImage,
    x: i64,
    y: i64,
    color: Rgba<u8>,
    coverage: f32,
) {
    if x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
        return;
    }
    let alpha = (f32::from(color[3]) / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let inv = 1.0 - alpha;
    for channel in 0..3 {
        let blended = f32::from(color[channel]) * alpha + f32::from(dst[channel]) * inv;
        dst[channel] = blended.round().clamp(0.0, 255.0) as u8;
    }
    let out_alpha = alpha * 255.0 + f32::from(dst[3]) * inv;
    dst[3] = out_alpha.round().clamp(0.0, 255.0) as u8;
}

/// Signed distance from (`px`, `py`) to the edge of a rounded rectangle;
/// negative inside.
fn rounded_rect_distance(rect: &Rect, radius: f32, px: f32, py: f32) -> f32 {
    let half_w = rect.width / 2.0;
    let half_h = rect.height / 2.0;
    let radius = radius.clamp(0.0, half_w.min(half_h).max(0.0));
    let cx = rect.x + half_w;
    let cy = rect.y + half_h;
    let qx = (px - cx).abs() - (half_w - radius);
    let qy = (py - cy).abs() - (half_h - radius);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    outside + inside - radius
}

/// Pixel bounds `(x0, y0, x1, y1)` a shape inside `rect` can touch,
/// including a one-pixel anti-aliasing fringe, clipped to the canvas.
fn covered_bounds(canvas: &RgbaImage, rect: &Rect) -> (i64, i64, i64, i64) {
    let x0 = (rect.x.floor() as i64 - 1).max(0);
    let y0 = (rect.y.floor() as i64 - 1).max(0);
    let x1 = (rect.right().ceil() as i64 + 1).min(i64::from(canvas.width()));
    let y1 = (rect.bottom().ceil() as i64 + 1).min(i64::from(canvas.height()));
    (x0, y0, x1, y1)
}

/// Blend `color` over every pixel of the rounded rectangle, weighting each
/// pixel by `coverage(signed_distance)`.
fn paint_rounded_rect(
    canvas: &mut RgbaImage,
    rect: &Rect,
    radius: f32,
    color: Rgba<u8>,
    coverage: impl Fn(f32) -> f32,
) {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let (x0, y0, x1, y1) = covered_bounds(canvas, rect);
    for y in y0..y1 {
        for x in x0..x1 {
            let d = rounded_rect_distance(rect, radius, x as f32 + 0.5, y as f32 + 0.5);
            blend_pixel(canvas, x, y, color, coverage(d).clamp(0.0, 1.0));
        }
    }
}

fn fill_rounded_rect(canvas: &mut RgbaImage, rect: &Rect, radius: f32, color: Rgba<u8>) {
    paint_rounded_rect(canvas, rect, radius, color, |d| 0.5 - d);
}

/// One-pixel stroke centred on the rectangle edge.
fn stroke_rounded_rect(canvas: &mut RgbaImage, rect: &Rect, radius: f32, color: Rgba<u8>) {
    paint_rounded_rect(canvas, rect, radius, color, |d| 1.0 - d.abs());
}
