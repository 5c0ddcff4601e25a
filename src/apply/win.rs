//! Windows login and lock screen mechanisms, most reliable first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use tracing::debug;
use windows::Win32::UI::WindowsAndMessaging::{
    SystemParametersInfoW, SPIF_SENDCHANGE, SPIF_UPDATEINIFILE, SYSTEM_PARAMETERS_INFO_ACTION,
};
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
use winreg::RegKey;

use super::{slots, Mechanism};
use crate::image_ops::{self, SLOT_JPEG_QUALITY};
use crate::powershell;
use crate::source::probes::{self, CSP_KEY, CSP_PATH_VALUE, POLICY_KEY, POLICY_VALUE};
use crate::wallpaper::to_wide_null;

const SYSTEM_POLICY_KEY: &str = r"SOFTWARE\Policies\Microsoft\Windows\System";
const LOGONUI_BACKGROUND_KEY: &str =
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Authentication\LogonUI\Background";
const OOBE_FILE: &str = "backgroundDefault.jpg";
/// Not exposed by the `windows` crate.
const SPI_SETLOCKSCREENWALLPAPER: SYSTEM_PARAMETERS_INFO_ACTION =
    SYSTEM_PARAMETERS_INFO_ACTION(0x0115);

const WINRT_SCRIPT: &str = r#"
$ErrorActionPreference = "Stop"
Add-Type -AssemblyName System.Runtime.WindowsRuntime
$asTaskGeneric = ([System.WindowsRuntimeSystemExtensions].GetMethods() | Where-Object { $_.Name -eq 'AsTask' -and $_.GetParameters().Count -eq 1 -and $_.GetParameters()[0].ParameterType.Name -eq 'IAsyncOperation`1' })[0]
Function Await($WinRtTask, $ResultType) {
    $asTask = $asTaskGeneric.MakeGenericMethod($ResultType)
    $netTask = $asTask.Invoke($null, @($WinRtTask))
    $netTask.Wait(-1) | Out-Null
    $netTask.Result
}
Function AwaitAction($WinRtTask) {
    $asTask = ([System.WindowsRuntimeSystemExtensions].GetMethods() | Where-Object { $_.Name -eq 'AsTask' -and $_.GetParameters().Count -eq 1 -and !$_.IsGenericMethod })[0]
    $netTask = $asTask.Invoke($null, @($WinRtTask))
    $netTask.Wait(-1) | Out-Null
}
[Windows.System.UserProfile.LockScreen,Windows.System.UserProfile,ContentType=WindowsRuntime] | Out-Null
[Windows.Storage.StorageFile,Windows.Storage,ContentType=WindowsRuntime] | Out-Null
$file = Await ([Windows.Storage.StorageFile]::GetFileFromPathAsync($imagePath)) ([Windows.Storage.StorageFile])
AwaitAction ([Windows.System.UserProfile.LockScreen]::SetImageFileAsync($file))
"#;

pub fn login_mechanisms() -> Vec<Mechanism> {
    vec![
        Mechanism::new("winrt lock screen", winrt_lock_screen),
        Mechanism::new("group policy", group_policy),
        Mechanism::new("oobe background", oobe_background),
        Mechanism::new("personalization csp", machine_csp),
    ]
}

pub fn lock_mechanisms() -> Vec<Mechanism> {
    vec![
        Mechanism::new("winrt lock screen", winrt_lock_screen),
        Mechanism::new("user personalization csp", user_csp),
        Mechanism::new("assets folder", assets_folder),
        Mechanism::new("system data folder", system_data_folder),
        Mechanism::new("machine lock policy", machine_lock),
    ]
}

fn path_string(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("path is not valid unicode: {}", path.display()))
}

/// `LockScreen.SetImageFileAsync`; takes effect immediately at user level.
fn winrt_lock_screen(path: &Path) -> Result<()> {
    let script = format!(
        "$imagePath = {}\n{WINRT_SCRIPT}",
        powershell::quote(&path_string(path)?)
    );
    powershell::run(&script).context("WinRT LockScreen call failed")?;
    Ok(())
}

/// Pro/Enterprise policy; may need a reboot or gpupdate to show.
fn group_policy(path: &Path) -> Result<()> {
    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let (personalization, _) = hklm
        .create_subkey(POLICY_KEY)
        .context("failed to open Personalization policy key")?;
    personalization
        .set_value(POLICY_VALUE, &path_string(path)?)
        .context("failed to set LockScreenImage")?;

    enable_logon_background(&hklm)
}

fn enable_logon_background(hklm: &RegKey) -> Result<()> {
    let (system, _) = hklm
        .create_subkey(SYSTEM_POLICY_KEY)
        .context("failed to open System policy key")?;
    system
        .set_value("DisableLogonBackgroundImage", &0u32)
        .context("failed to set DisableLogonBackgroundImage")?;
    Ok(())
}

/// Legacy OEM background slot; the file name is fixed by Windows.
fn oobe_background(path: &Path) -> Result<()> {
    let dir = probes::oobe_backgrounds_dir().ok_or_else(|| anyhow!("SystemRoot is not set"))?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    image_ops::export_jpeg(path, &dir.join(OOBE_FILE), SLOT_JPEG_QUALITY)?;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let (background, _) = hklm
        .create_subkey(LOGONUI_BACKGROUND_KEY)
        .context("failed to open LogonUI Background key")?;
    background
        .set_value("OEMBackground", &1u32)
        .context("failed to set OEMBackground")?;
    Ok(())
}

fn write_csp(root: &RegKey, path: &Path) -> Result<()> {
    let (csp, _) = root
        .create_subkey(CSP_KEY)
        .context("failed to open PersonalizationCSP key")?;
    let value = path_string(path)?;
    csp.set_value(CSP_PATH_VALUE, &value)
        .context("failed to set LockScreenImagePath")?;
    csp.set_value("LockScreenImageUrl", &value)
        .context("failed to set LockScreenImageUrl")?;
    csp.set_value("LockScreenImageStatus", &1u32)
        .context("failed to set LockScreenImageStatus")?;
    Ok(())
}

fn machine_csp(path: &Path) -> Result<()> {
    write_csp(&RegKey::predef(HKEY_LOCAL_MACHINE), path)
}

fn user_csp(path: &Path) -> Result<()> {
    write_csp(&RegKey::predef(HKEY_CURRENT_USER), path)
}

fn env_dir(name: &str) -> Result<PathBuf> {
    std::env::var_os(name)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("{name} is not set"))
}

fn copy_into(image: &Path, target: &Path) -> Result<()> {
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    image_ops::copy_atomic(image, target)
}

/// Copy into the content delivery assets folder, then ask the shell directly.
fn assets_folder(path: &Path) -> Result<()> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let target = slots::assets_copy(&env_dir("LOCALAPPDATA")?, path, nanos);
    copy_into(path, &target)?;

    let wide_path = to_wide_null(path);
    // Unsupported on most builds; the copy alone counts as success.
    if let Err(err) = unsafe {
        SystemParametersInfoW(
            SPI_SETLOCKSCREENWALLPAPER,
            0,
            Some(wide_path.as_ptr() as *mut _),
            SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
        )
    } {
        debug!(error = %err, "SPI_SETLOCKSCREENWALLPAPER rejected");
    }
    Ok(())
}

/// Usually denied on current builds.
fn system_data_folder(path: &Path) -> Result<()> {
    copy_into(path, &slots::system_data_copy(&env_dir("PROGRAMDATA")?, path))
}

fn machine_lock(path: &Path) -> Result<()> {
    enable_logon_background(&RegKey::predef(HKEY_LOCAL_MACHINE))?;
    machine_csp(path)
}
