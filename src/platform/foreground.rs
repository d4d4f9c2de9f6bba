//! 前台进程检测。
//!
//! - Windows：前台窗口 → 进程 ID → 可执行文件名
//! - macOS：`osascript` 查询最前面的进程名
//! - 其他平台：不支持，白名单检查直接放行

use crate::pipeline::ForegroundProcess;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemForeground;

impl SystemForeground {
    pub fn new() -> Self {
        Self
    }
}

impl ForegroundProcess for SystemForeground {
    fn active_process_name(&self) -> Option<String> {
        let name = query_foreground_process();
        log::debug!("前台进程: {:?}", name);
        name.map(|n| n.trim().to_lowercase())
    }

    fn is_supported(&self) -> bool {
        cfg!(any(target_os = "windows", target_os = "macos"))
    }
}

#[cfg(target_os = "windows")]
fn query_foreground_process() -> Option<String> {
    use std::path::Path;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
        QueryFullProcessImageNameW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};
    use windows::core::PWSTR;

    unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.is_invalid() {
            return None;
        }

        let mut pid = 0u32;
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
        if pid == 0 {
            return None;
        }

        let handle = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("OpenProcess 失败 pid={}: {:?}", pid, e);
                return None;
            }
        };

        let mut buffer = [0u16; 1024];
        let mut len = buffer.len() as u32;
        let queried = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut len,
        );
        let _ = CloseHandle(handle);
        queried.ok()?;

        let full_path = String::from_utf16_lossy(&buffer[..len as usize]);
        Path::new(&full_path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
    }
}

#[cfg(target_os = "macos")]
fn query_foreground_process() -> Option<String> {
    let output = std::process::Command::new("osascript")
        .args([
            "-e",
            "tell application \"System Events\" to get name of first process whose frontmost is true",
        ])
        .output()
        .ok()?;

    if !output.status.success() {
        log::debug!("osascript 返回非零状态: {:?}", output.status.code());
        return None;
    }

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn query_foreground_process() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    #[test]
    fn unsupported_platform_reports_no_process() {
        let foreground = SystemForeground::new();
        assert!(!foreground.is_supported());
        assert_eq!(foreground.active_process_name(), None);
    }
}
