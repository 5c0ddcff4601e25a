//! Host facts for the right panel.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};

use super::StatusSource;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
/// First Windows 11 build; the registry still reports "Windows 10".
const WINDOWS_11_BUILD: u32 = 22000;

#[derive(Debug, Clone)]
pub struct HostSnapshot {
    pub hostname: String,
    pub os: String,
    pub ram_bytes: Option<u64>,
    pub uptime: Option<Duration>,
    pub generated_at: DateTime<Local>,
}

impl HostSnapshot {
    pub fn gather() -> Self {
        Self {
            hostname: platform::hostname().unwrap_or_else(|| "Unknown".to_string()),
            os: platform::os_label(),
            ram_bytes: platform::total_memory(),
            uptime: platform::uptime(),
            generated_at: Local::now(),
        }
    }

    pub fn format_lines(&self) -> Vec<String> {
        let mut lines = vec![self.hostname.clone(), self.os.clone()];
        lines.push(match self.ram_bytes {
            Some(bytes) => format!("{:.0} GB RAM", bytes as f64 / GIB),
            None => "RAM: Unknown".to_string(),
        });
        if let Some(uptime) = self.uptime {
            lines.push(format!("Uptime: {}", format_uptime(uptime)));
        }
        lines.push(
            self.generated_at
                .format("Generated: %b %-d, %Y %-I:%M %p")
                .to_string(),
        );
        lines
    }
}

/// `Xd Yh Zm`, dropping leading zero units.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Product name with its display version, corrected for Windows 11.
pub fn windows_label(product: &str, display_version: Option<&str>, build: Option<u32>) -> String {
    let product = product.trim().trim_start_matches("Microsoft ");
    let mut label = match build {
        Some(build) if build >= WINDOWS_11_BUILD && product.starts_with("Windows 10") => {
            product.replacen("Windows 10", "Windows 11", 1)
        }
        _ => product.to_string(),
    };
    if let Some(version) = display_version.map(str::trim).filter(|v| !v.is_empty()) {
        label.push(' ');
        label.push_str(version);
    }
    label
}

/// The local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostInfo;

impl StatusSource for HostInfo {
    fn name(&self) -> &'static str {
        "host"
    }

    fn lines(&self) -> Result<Vec<String>> {
        Ok(HostSnapshot::gather().format_lines())
    }
}

#[cfg(windows)]
mod platform {
    use std::time::Duration;

    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE};
    use winreg::RegKey;
    use windows::Win32::System::SystemInformation::{
        GetTickCount64, GlobalMemoryStatusEx, MEMORYSTATUSEX,
    };

    const VERSION_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";

    pub fn hostname() -> Option<String> {
        std::env::var("COMPUTERNAME").ok().filter(|h| !h.is_empty())
    }

    pub fn os_label() -> String {
        let Ok(key) =
            RegKey::predef(HKEY_LOCAL_MACHINE).open_subkey_with_flags(VERSION_KEY, KEY_QUERY_VALUE)
        else {
            return "Windows".to_string();
        };
        let product: String = key
            .get_value("ProductName")
            .unwrap_or_else(|_| "Windows".to_string());
        let display_version: Option<String> = key.get_value("DisplayVersion").ok();
        let build = key
            .get_value::<String, _>("CurrentBuildNumber")
            .ok()
            .and_then(|b| b.trim().parse().ok());
        super::windows_label(&product, display_version.as_deref(), build)
    }

    pub fn total_memory() -> Option<u64> {
        let mut status = MEMORYSTATUSEX {
            dwLength: std::mem::size_of::<MEMORYSTATUSEX>() as u32,
            ..Default::default()
        };
        unsafe { GlobalMemoryStatusEx(&mut status) }.ok()?;
        Some(status.ullTotalPhys)
    }

    pub fn uptime() -> Option<Duration> {
        Some(Duration::from_millis(unsafe { GetTickCount64() }))
    }
}

#[cfg(not(windows))]
mod platform {
    use std::fs;
    use std::time::Duration;

    pub fn hostname() -> Option<String> {
        fs::read_to_string("/etc/hostname")
            .ok()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .or_else(|| std::env::var("HOSTNAME").ok())
    }

    pub fn os_label() -> String {
        fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|release| {
                release.lines().find_map(|line| {
                    line.strip_prefix("PRETTY_NAME=")
                        .map(|v| v.trim_matches('"').to_string())
                })
            })
            .unwrap_or_else(|| std::env::consts::OS.to_string())
    }

    pub fn total_memory() -> Option<u64> {
        let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
        let kib: u64 = meminfo
            .lines()
            .find_map(|line| line.strip_prefix("MemTotal:"))?
            .trim()
            .trim_end_matches("kB")
            .trim()
            .parse()
            .ok()?;
        Some(kib * 1024)
    }

    pub fn uptime() -> Option<Duration> {
        let raw = fs::read_to_string("/proc/uptime").ok()?;
        let secs: f64 = raw.split_whitespace().next()?.parse().ok()?;
        Some(Duration::from_secs_f64(secs))
    }
}
