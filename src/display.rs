//! Primary display resolution.

/// Used when the resolution cannot be queried.
pub const FALLBACK_RESOLUTION: (u32, u32) = (1920, 1080);

/// Primary monitor size in pixels, or [`FALLBACK_RESOLUTION`].
pub fn primary_resolution() -> (u32, u32) {
    query().unwrap_or(FALLBACK_RESOLUTION)
}

#[cfg(windows)]
fn query() -> Option<(u32, u32)> {
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
    let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
    valid(width, height)
}

#[cfg(not(windows))]
fn query() -> Option<(u32, u32)> {
    None
}

#[cfg_attr(not(windows), allow(dead_code))]
fn valid(width: i32, height: i32) -> Option<(u32, u32)> {
    let width = u32::try_from(width).ok().filter(|w| *w > 0)?;
    let height = u32::try_from(height).ok().filter(|h| *h > 0)?;
    Some((width, height))
}
