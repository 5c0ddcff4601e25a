//! Status panel rendering: brightness analysis, scaled layout, adaptive
//! colors, and compositing.

pub mod brightness;
pub mod colors;
pub mod font;
pub mod layout;
pub mod render;

pub use colors::TextColor;
pub use font::{FontError, FontFace, Typeface};
pub use layout::ScaledDimensions;
pub use render::{layout_panels, render_panels, render_status_overlay, Panel, PanelContent, Rect};
