use std::time::Duration;

use ua_core::{EnvironmentProbe, Platform};

/// Probe for platforms without active window detection.
///
/// Reports no application and zero idle time, so every tick is a no-op that
/// still advances the flush clock.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedProbe {
    platform: Platform,
}

impl UnsupportedProbe {
    pub const fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Fallback for the platform this binary was built for.
    pub const fn current() -> Self {
        Self::new(Platform::current())
    }
}

impl EnvironmentProbe for UnsupportedProbe {
    fn active_application(&self) -> Option<String> {
        None
    }

    fn idle_duration(&self) -> Duration {
        Duration::ZERO
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_supported(&self) -> bool {
        false
    }
}
