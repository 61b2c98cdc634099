//! X11 probe.
//!
//! The focused window comes from the root window's `_NET_ACTIVE_WINDOW`
//! property. Its owning process is resolved through `_NET_WM_PID` and `/proc`,
//! falling back to the `WM_CLASS` instance name when the window does not
//! advertise a PID. Idle time comes from the MIT-SCREEN-SAVER extension.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::debug;
use ua_core::{EnvironmentProbe, Platform};
use x11rb::connection::Connection;
use x11rb::protocol::screensaver;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, Window};
use x11rb::rust_connection::RustConnection;

use crate::ProbeError;

#[derive(Debug, Clone, Copy)]
struct Atoms {
    net_active_window: Atom,
    net_wm_pid: Atom,
}

/// Probe backed by a connection to the X server.
pub struct X11Probe {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

impl fmt::Debug for X11Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11Probe")
            .field("root", &self.root)
            .field("atoms", &self.atoms)
            .finish_non_exhaustive()
    }
}

impl X11Probe {
    /// Connects to the display named by `$DISPLAY`.
    pub fn connect() -> Result<Self, ProbeError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or(ProbeError::MissingScreen(screen_num))?
            .root;

        screensaver::query_version(&conn, 1, 1)?.reply()?;

        let atoms = Atoms {
            net_active_window: intern(&conn, b"_NET_ACTIVE_WINDOW")?,
            net_wm_pid: intern(&conn, b"_NET_WM_PID")?,
        };
        debug!(screen = screen_num, root, "connected to X server");

        Ok(Self { conn, root, atoms })
    }

    fn first_u32(&self, window: Window, property: Atom, kind: AtomEnum) -> Option<u32> {
        let reply = self
            .conn
            .get_property(false, window, property, kind, 0, 1)
            .ok()?
            .reply()
            .ok()?;
        reply.value32()?.next()
    }

    fn active_window(&self) -> Option<Window> {
        self.first_u32(self.root, self.atoms.net_active_window, AtomEnum::WINDOW)
            .filter(|window| *window != x11rb::NONE)
    }

    fn window_pid(&self, window: Window) -> Option<u32> {
        self.first_u32(window, self.atoms.net_wm_pid, AtomEnum::CARDINAL)
            .filter(|pid| *pid != 0)
    }

    fn window_class(&self, window: Window) -> Option<String> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)
            .ok()?
            .reply()
            .ok()?;
        instance_name(&reply.value)
    }
}

impl EnvironmentProbe for X11Probe {
    fn active_application(&self) -> Option<String> {
        let window = self.active_window()?;
        self.window_pid(window)
            .and_then(|pid| process_name(Path::new("/proc"), pid))
            .or_else(|| self.window_class(window))
    }

    fn idle_duration(&self) -> Duration {
        let info = screensaver::query_info(&self.conn, self.root)
            .ok()
            .and_then(|cookie| cookie.reply().ok());

        match info {
            Some(info) => Duration::from_millis(u64::from(info.ms_since_user_input)),
            None => {
                debug!("screensaver query failed");
                Duration::ZERO
            }
        }
    }

    fn platform(&self) -> Platform {
        Platform::Linux
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, ProbeError> {
    Ok(conn.intern_atom(false, name)?.reply()?.atom)
}

/// Suffix the kernel appends to `/proc/<pid>/exe` once the binary is replaced.
const DELETED_SUFFIX: &str = " (deleted)";

/// Resolves a PID to its executable name using a procfs root.
fn process_name(proc_root: &Path, pid: u32) -> Option<String> {
    let process_dir = proc_root.join(pid.to_string());

    if let Ok(exe) = fs::read_link(process_dir.join("exe")) {
        let name = exe
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.strip_suffix(DELETED_SUFFIX).unwrap_or(name))
            .filter(|name| !name.is_empty());
        if let Some(name) = name {
            return Some(name.to_string());
        }
    }

    let comm = fs::read_to_string(process_dir.join("comm")).ok()?;
    let comm = comm.trim();
    (!comm.is_empty()).then(|| comm.to_string())
}

/// Extracts the instance part of a `WM_CLASS` value (`instance\0class\0`).
fn instance_name(value: &[u8]) -> Option<String> {
    value
        .split(|byte| *byte == 0)
        .find(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
}
