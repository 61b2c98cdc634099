//! Win32 probe.

#![expect(unsafe_code, reason = "Win32 calls have no safe wrappers")]

use std::mem;
use std::path::Path;
use std::time::Duration;

use tracing::debug;
use ua_core::{EnvironmentProbe, Platform};
use windows::Win32::Foundation::CloseHandle;
use windows::Win32::System::SystemInformation::GetTickCount;
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};
use windows::core::PWSTR;

const IMAGE_PATH_CAPACITY: usize = 1024;

/// Probe backed by the user32 foreground window and last-input APIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsProbe;

impl WindowsProbe {
    pub const fn new() -> Self {
        Self
    }

    fn foreground_process_id() -> Option<u32> {
        let mut process_id: u32 = 0;
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0.is_null() {
                return None;
            }
            GetWindowThreadProcessId(hwnd, Some(&raw mut process_id));
        }
        (process_id != 0).then_some(process_id)
    }

    fn image_path(process_id: u32) -> Option<String> {
        let mut buffer = [0u16; IMAGE_PATH_CAPACITY];
        let mut size = u32::try_from(buffer.len()).ok()?;

        let queried = unsafe {
            let handle =
                OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id).ok()?;
            let result = QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &raw mut size,
            );
            let _ = CloseHandle(handle);
            result
        };
        if let Err(err) = queried {
            debug!(process_id, error = %err, "could not query process image name");
            return None;
        }

        let len = usize::try_from(size).ok()?;
        buffer
            .get(..len)
            .map(String::from_utf16_lossy)
    }
}

impl EnvironmentProbe for WindowsProbe {
    fn active_application(&self) -> Option<String> {
        let process_id = Self::foreground_process_id()?;
        let path = Self::image_path(process_id)?;
        executable_stem(&path)
    }

    fn idle_duration(&self) -> Duration {
        let mut info = LASTINPUTINFO {
            cbSize: u32::try_from(mem::size_of::<LASTINPUTINFO>()).unwrap_or(u32::MAX),
            dwTime: 0,
        };
        let (ok, now) = unsafe { (GetLastInputInfo(&raw mut info).as_bool(), GetTickCount()) };
        if !ok {
            debug!("GetLastInputInfo failed");
            return Duration::ZERO;
        }
        // Both values come from the same 32-bit millisecond tick counter, which wraps every ~49.7 days.
        Duration::from_millis(u64::from(now.wrapping_sub(info.dwTime)))
    }

    fn platform(&self) -> Platform {
        Platform::Windows
    }
}

/// Process name as Windows reports it: the image file name without `.exe`.
fn executable_stem(path: &str) -> Option<String> {
    let file_name = path.rsplit('\\').next()?;
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}
