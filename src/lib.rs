//! Login-screen status overlay for Windows.
//!
//! Finds the pristine login background, renders host and service status
//! panels onto it, and pushes the result through every login-screen
//! mechanism the OS exposes.

pub mod apply;
pub mod display;
pub mod image_ops;
pub mod logging;
pub mod overlay;
#[cfg(windows)]
mod powershell;
pub mod settings;
pub mod source;
pub mod status;
pub mod update;
pub mod wallpaper;
