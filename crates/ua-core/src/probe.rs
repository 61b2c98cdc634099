//! Environment probe capability.

use std::time::Duration;

use crate::types::Platform;

/// Read-only view of the user's desktop environment.
///
/// One implementation exists per operating system and is selected once at
/// startup. Implementations never fail: a reading that cannot be taken is
/// reported as `None` (for the active application) or zero (for idle time).
pub trait EnvironmentProbe {
    /// Identifier of the application owning the focused window.
    ///
    /// Returns `None` when there is no foreground window or the platform cannot
    /// tell. `None` means "nothing to record", never "the user is idle".
    fn active_application(&self) -> Option<String>;

    /// Time since the last keyboard or mouse input, from a monotonic clock.
    fn idle_duration(&self) -> Duration;

    /// The platform this probe reports for.
    fn platform(&self) -> Platform;

    /// False for the fallback probe used on platforms without a real implementation.
    fn is_supported(&self) -> bool {
        true
    }
}

impl<P: EnvironmentProbe + ?Sized> EnvironmentProbe for Box<P> {
    fn active_application(&self) -> Option<String> {
        (**self).active_application()
    }

    fn idle_duration(&self) -> Duration {
        (**self).idle_duration()
    }

    fn platform(&self) -> Platform {
        (**self).platform()
    }

    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }
}
