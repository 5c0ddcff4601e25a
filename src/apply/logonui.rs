//! Forcing LogonUI to reload its cached background at boot.

use std::os::windows::process::CommandExt;
use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    keybd_event, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP, VK_ESCAPE,
};

const LOGONUI_IMAGE: &str = "LogonUI.exe";
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
/// Windows respawns LogonUI on its own; give it time to come back.
const RESPAWN_WAIT: Duration = Duration::from_secs(2);

/// Restart LogonUI if it is showing, then dismiss the credential prompt.
///
/// Returns `false` when LogonUI was not running (a user is signed in).
pub fn refresh() -> Result<bool> {
    if !is_running()? {
        info!("LogonUI not running, skipping restart");
        return Ok(false);
    }

    info!("restarting LogonUI");
    let status = Command::new("taskkill")
        .args(["/f", "/im", LOGONUI_IMAGE])
        .creation_flags(CREATE_NO_WINDOW)
        .status()
        .context("failed to run taskkill")?;
    if !status.success() {
        warn!(%status, "taskkill reported failure");
    }

    thread::sleep(RESPAWN_WAIT);
    send_escape();
    thread::sleep(Duration::from_millis(500));
    send_escape();
    Ok(true)
}

fn is_running() -> Result<bool> {
    let output = Command::new("tasklist")
        .args(["/fi", "imagename eq LogonUI.exe", "/fo", "csv", "/nh"])
        .creation_flags(CREATE_NO_WINDOW)
        .output()
        .context("failed to run tasklist")?;
    Ok(String::from_utf8_lossy(&output.stdout).contains(LOGONUI_IMAGE))
}

fn send_escape() {
    let vk = VK_ESCAPE.0 as u8;
    // Must reach the secure desktop LogonUI runs on.
    unsafe {
        keybd_event(vk, 0, KEYBD_EVENT_FLAGS(0), 0);
    }
    thread::sleep(Duration::from_millis(100));
    unsafe {
        keybd_event(vk, 0, KEYEVENTF_KEYUP, 0);
    }
}
