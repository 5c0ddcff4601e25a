//! Windows service health summary for the left panel.

use std::collections::HashMap;

use anyhow::Result;

use super::StatusSource;

/// Failed services shown before collapsing the rest into a count.
const MAX_FAILED_SHOWN: usize = 10;

const DESKTOP_CRITICAL: &[&str] = &[
    "Dhcp",
    "Dnscache",
    "wuauserv",
    "WinDefend",
    "Spooler",
    "EventLog",
    "Schedule",
    "W32Time",
];

const SERVER_CRITICAL: &[&str] = &[
    "NTDS",
    "DNS",
    "DHCPServer",
    "W3SVC",
    "MSSQLSERVER",
    "vmms",
    "CertSvc",
    "Netlogon",
    "DFSR",
    "LanmanServer",
];

/// One row of the service query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub state: String,
    pub start_mode: String,
}

impl ServiceRecord {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("Running")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub name: String,
    pub state: String,
}

impl ServiceStatus {
    fn from_record(record: &ServiceRecord) -> Self {
        Self {
            name: record.name.clone(),
            state: record.state.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state.eq_ignore_ascii_case("Running")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicesSummary {
    pub running: usize,
    pub total: usize,
    /// Installed critical services in list order.
    pub critical: Vec<ServiceStatus>,
    /// Auto-start services that are not running.
    pub failed: Vec<ServiceStatus>,
}

/// Parse `Name|State|StartMode` lines; malformed lines are skipped.
pub fn parse_records(output: &str) -> Vec<ServiceRecord> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().splitn(3, '|');
            let name = parts.next()?.trim();
            let state = parts.next()?.trim();
            let start_mode = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(ServiceRecord {
                name: name.to_string(),
                state: state.to_string(),
                start_mode: start_mode.to_string(),
            })
        })
        .collect()
}

/// Critical service names: the desktop set, the server set when on a
/// server, then any configured extras not already listed.
pub fn critical_service_names(is_server: bool, extra: &[String]) -> Vec<String> {
    let mut names: Vec<String> = DESKTOP_CRITICAL.iter().map(|s| s.to_string()).collect();
    if is_server {
        names.extend(SERVER_CRITICAL.iter().map(|s| s.to_string()));
    }
    for name in extra {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name.clone());
        }
    }
    names
}

pub fn display_name(service: &str) -> &str {
    match service {
        "Dhcp" => "DHCP Client",
        "Dnscache" => "DNS Client",
        "wuauserv" => "Windows Update",
        "WinDefend" => "Windows Defender",
        "Spooler" => "Print Spooler",
        "EventLog" => "Event Log",
        "Schedule" => "Task Scheduler",
        "W32Time" => "Windows Time",
        "NTDS" => "AD Domain Services",
        "DNS" => "DNS Server",
        "DHCPServer" => "DHCP Server",
        "W3SVC" => "IIS Web Server",
        "MSSQLSERVER" => "SQL Server",
        "vmms" => "Hyper-V Manager",
        "CertSvc" => "Certificate Services",
        "DFSR" => "DFS Replication",
        "LanmanServer" => "File Server",
        other => other,
    }
}

impl ServicesSummary {
    pub fn from_records(records: &[ServiceRecord], is_server: bool, extra: &[String]) -> Self {
        let by_name: HashMap<&str, &ServiceRecord> =
            records.iter().map(|r| (r.name.as_str(), r)).collect();

        let critical = critical_service_names(is_server, extra)
            .iter()
            .filter_map(|name| by_name.get(name.as_str()))
            .map(|record| ServiceStatus::from_record(record))
            .collect();
        let failed = records
            .iter()
            .filter(|r| r.start_mode.eq_ignore_ascii_case("Auto") && !r.is_running())
            .map(ServiceStatus::from_record)
            .collect();

        Self {
            running: records.iter().filter(|r| r.is_running()).count(),
            total: records.len(),
            critical,
            failed,
        }
    }

    pub fn format_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Services Status".to_string(),
            String::new(),
            format!("Running: {} / {}", self.running, self.total),
        ];

        if !self.critical.is_empty() {
            lines.push(String::new());
            lines.push("Critical Services:".to_string());
            for svc in &self.critical {
                let status = if svc.is_ok() { "OK" } else { svc.state.as_str() };
                lines.push(format!("  {}: {status}", display_name(&svc.name)));
            }
        }

        lines.push(String::new());
        if self.failed.is_empty() {
            lines.push("No failed services".to_string());
        } else {
            lines.push("Failed Services:".to_string());
            for svc in self.failed.iter().take(MAX_FAILED_SHOWN) {
                lines.push(format!("  {}: {}", display_name(&svc.name), svc.state));
            }
            if self.failed.len() > MAX_FAILED_SHOWN {
                lines.push(format!(
                    "  ... and {} more",
                    self.failed.len() - MAX_FAILED_SHOWN
                ));
            }
        }
        lines
    }
}

/// Live service data from the local service manager.
#[derive(Debug, Clone, Default)]
pub struct ServicesSource {
    #[cfg_attr(not(windows), allow(dead_code))]
    extra_critical: Vec<String>,
}

impl ServicesSource {
    pub fn new(extra_critical: Vec<String>) -> Self {
        Self { extra_critical }
    }

    #[cfg(windows)]
    pub fn gather(&self) -> Result<ServicesSummary> {
        use anyhow::Context;

        const QUERY: &str = "Get-CimInstance -ClassName Win32_Service | \
             ForEach-Object { '{0}|{1}|{2}' -f $_.Name, $_.State, $_.StartMode }";
        let output = crate::powershell::run(QUERY).context("failed to query services")?;
        let records = parse_records(&output);
        anyhow::ensure!(!records.is_empty(), "service query returned no services");
        Ok(ServicesSummary::from_records(
            &records,
            is_server(),
            &self.extra_critical,
        ))
    }

    #[cfg(not(windows))]
    pub fn gather(&self) -> Result<ServicesSummary> {
        anyhow::bail!("service status is only available on Windows")
    }
}

#[cfg(windows)]
fn is_server() -> bool {
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE};
    use winreg::RegKey;

    RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey_with_flags(r"SOFTWARE\Microsoft\Windows NT\CurrentVersion", KEY_QUERY_VALUE)
        .and_then(|key| key.get_value::<String, _>("InstallationType"))
        .map(|kind| kind.to_ascii_lowercase().contains("server"))
        .unwrap_or(false)
}

impl StatusSource for ServicesSource {
    fn name(&self) -> &'static str {
        "services"
    }

    fn lines(&self) -> Result<Vec<String>> {
        Ok(self.gather()?.format_lines())
    }
}
