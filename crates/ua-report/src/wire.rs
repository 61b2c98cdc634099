//! JSON body sent to the collector.
//!
//! With a reporting identity the records are wrapped in an envelope:
//!
//! ```json
//! {"userName":"devbox","appUsages":[{"applicationId":"Code","secondsUsed":60,"environment":"windows"}]}
//! ```
//!
//! Without one, the body is the bare record array.

use serde::Serialize;
use ua_core::{Platform, UsageReport};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord<'a> {
    application_id: &'a str,
    seconds_used: u64,
    environment: Platform,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    user_name: &'a str,
    app_usages: Vec<WireRecord<'a>>,
}

/// Serializes a report into the request body.
pub fn encode(report: &UsageReport) -> Result<Vec<u8>, serde_json::Error> {
    let app_usages: Vec<WireRecord<'_>> = report
        .batch
        .iter()
        .map(|(application_id, seconds_used)| WireRecord {
            application_id: application_id.as_str(),
            seconds_used,
            environment: report.platform,
        })
        .collect();

    match report.identity.as_deref() {
        Some(user_name) => serde_json::to_vec(&Envelope {
            user_name,
            app_usages,
        }),
        None => serde_json::to_vec(&app_usages),
    }
}
