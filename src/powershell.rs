//! Hidden PowerShell invocations for APIs only reachable through WinRT/CIM.

use std::os::windows::process::CommandExt;
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Suppress the console window when launched from a scheduled task.
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Run `script` and return its stdout.
pub fn run(script: &str) -> Result<String> {
    let output = Command::new("powershell.exe")
        .args([
            "-NoProfile",
            "-NonInteractive",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            script,
        ])
        .creation_flags(CREATE_NO_WINDOW)
        .output()
        .context("failed to launch powershell.exe")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        bail!(
            "powershell exited with {}: {}",
            output.status,
            if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() }
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Quote `value` as a single-quoted PowerShell literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
