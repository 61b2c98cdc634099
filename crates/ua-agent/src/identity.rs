//! Reporting identity.
//!
//! Reports can carry a machine or user name alongside the usage records. By
//! default this is the hostname; `identity` in the config overrides it and
//! `include_identity = false` omits it entirely.

use crate::Config;

/// Name used when the hostname cannot be determined.
const UNKNOWN_MACHINE: &str = "unknown";

/// Resolves the identity to attach to reports, if any.
pub fn resolve_identity(config: &Config) -> Option<String> {
    if !config.include_identity {
        return None;
    }

    let configured = config
        .identity
        .as_deref()
        .map(str::trim)
        .filter(|identity| !identity.is_empty());
    Some(configured.map_or_else(machine_name, str::to_string))
}

/// The machine's hostname, or `"unknown"`.
pub fn machine_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_MACHINE.to_string())
}
