//! Platform probes for the usage agent.
//!
//! Each supported operating system gets one [`EnvironmentProbe`]
//! implementation; [`detect`] picks the right one once at startup. Platforms
//! without a probe (and Linux sessions without an X server) fall back to
//! [`UnsupportedProbe`], which never reports an application.

#[cfg(target_os = "linux")]
mod linux;
mod unsupported;
#[cfg(target_os = "windows")]
mod win32;

use thiserror::Error;
use ua_core::EnvironmentProbe;

#[cfg(target_os = "linux")]
pub use linux::X11Probe;
pub use unsupported::UnsupportedProbe;
#[cfg(target_os = "windows")]
pub use win32::WindowsProbe;

/// Errors raised while setting up a platform probe.
///
/// Once constructed, probes do not fail; individual readings degrade to "no
/// application" or "not idle".
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Could not open a connection to the X server.
    #[cfg(target_os = "linux")]
    #[error("failed to connect to X server: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),
    /// The X connection broke or lacks a required extension.
    #[cfg(target_os = "linux")]
    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),
    /// An X request returned an error.
    #[cfg(target_os = "linux")]
    #[error("X11 request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),
    /// The default screen reported by the server does not exist.
    #[error("screen {0} not found")]
    MissingScreen(usize),
}

/// Selects the probe for the running platform.
#[cfg(target_os = "linux")]
pub fn detect() -> Box<dyn EnvironmentProbe> {
    match X11Probe::connect() {
        Ok(probe) => {
            tracing::info!("using X11 probe");
            Box::new(probe)
        }
        Err(err) => {
            tracing::warn!(error = %err, "X11 probe unavailable");
            Box::new(UnsupportedProbe::current())
        }
    }
}

/// Selects the probe for the running platform.
#[cfg(target_os = "windows")]
pub fn detect() -> Box<dyn EnvironmentProbe> {
    tracing::info!("using Win32 probe");
    Box::new(WindowsProbe::new())
}

/// Selects the probe for the running platform.
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
pub fn detect() -> Box<dyn EnvironmentProbe> {
    Box::new(UnsupportedProbe::current())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ua_core::Platform;

    #[test]
    fn detect_reports_current_platform() {
        let probe = detect();
        if probe.is_supported() {
            assert_eq!(probe.platform(), Platform::current());
        } else {
            assert!(probe.active_application().is_none());
        }
    }

    #[test]
    fn missing_screen_error_message() {
        assert_eq!(ProbeError::MissingScreen(3).to_string(), "screen 3 not found");
    }
}
