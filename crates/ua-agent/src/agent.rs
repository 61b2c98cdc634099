//! Wiring of probe, scheduler, flusher and shutdown signals.

use anyhow::{Context, Result};
use tracing::{info, warn};
use ua_core::{
    EnvironmentProbe, Flusher, Platform, RunSummary, SampleScheduler, ShutdownToken,
    shutdown_channel,
};
use ua_report::Client;

use crate::Config;
use crate::identity::resolve_identity;

/// Builds the flusher that posts reports to the configured collector.
pub fn build_flusher(config: &Config, platform: Platform) -> Result<Flusher<Client>> {
    let client = Client::new(&config.endpoint, config.api_key()?, &config.client_options())
        .context("failed to create collector client")?;
    let identity = resolve_identity(config);
    info!(
        endpoint = %client.endpoint(),
        identity = identity.as_deref().unwrap_or("-"),
        "reporting to collector"
    );
    Ok(Flusher::new(client, identity, platform))
}

/// Validates everything needed to start, without touching the display.
pub fn check(config: &Config) -> Result<()> {
    config.validate()?;
    build_flusher(config, Platform::current())?;
    Ok(())
}

/// Runs the agent with the platform probe until SIGINT or SIGTERM.
pub async fn run(config: &Config) -> Result<RunSummary> {
    let probe = ua_probe::detect();
    run_with_probe(config, probe).await
}

/// Runs the agent with a given probe until SIGINT or SIGTERM.
pub async fn run_with_probe<P: EnvironmentProbe>(config: &Config, probe: P) -> Result<RunSummary> {
    let (sender, token) = shutdown_channel();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                info!("shutdown requested");
                sender.shutdown();
            }
            Err(err) => warn!(error = %err, "failed to listen for shutdown signals"),
        }
    });

    run_until(config, probe, token).await
}

/// Runs the agent with a given probe until `shutdown` fires.
pub async fn run_until<P: EnvironmentProbe>(
    config: &Config,
    probe: P,
    shutdown: ShutdownToken,
) -> Result<RunSummary> {
    config.validate()?;
    let scheduler_config = config
        .scheduler_config()
        .context("invalid sampling configuration")?;
    let flusher = build_flusher(config, probe.platform())?;
    let scheduler = SampleScheduler::new(probe, scheduler_config);

    Ok(scheduler
        .run(&flusher, shutdown, config.flush_on_shutdown)
        .await)
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct FocusedEditor;

    impl EnvironmentProbe for FocusedEditor {
        fn active_application(&self) -> Option<String> {
            Some("Editor".to_string())
        }

        fn idle_duration(&self) -> Duration {
            Duration::ZERO
        }

        fn platform(&self) -> Platform {
            Platform::Linux
        }
    }

    /// Config pointing at a port nothing listens on.
    fn unreachable_collector(flush_on_shutdown: bool) -> Config {
        Config {
            endpoint: "https://127.0.0.1:9/api/".to_string(),
            sample_interval_secs: 1,
            flush_interval_secs: 60,
            request_timeout_secs: 2,
            flush_on_shutdown,
            ..config()
        }
    }

    async fn run_one_tick(config: &Config) -> RunSummary {
        let (sender, token) = shutdown_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            sender.shutdown();
        });
        run_until(config, FocusedEditor, token).await.unwrap()
    }

    fn config() -> Config {
        Config {
            api_key: Some("secret".to_string()),
            identity: Some("devbox".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn check_accepts_valid_config() {
        check(&config()).unwrap();
    }

    #[test]
    fn check_rejects_plain_http_endpoint() {
        let config = Config {
            endpoint: "http://collector.example.com/".to_string(),
            ..config()
        };
        let err = check(&config).unwrap_err();
        assert!(format!("{err:#}").contains("https"));
    }

    #[test]
    fn check_rejects_missing_key() {
        let config = Config {
            api_key: None,
            ..config()
        };
        assert!(check(&config).is_err());
    }

    #[test]
    fn flusher_carries_identity() {
        let flusher = build_flusher(&config(), Platform::Linux).unwrap();
        assert_eq!(flusher.identity(), Some("devbox"));
    }

    #[tokio::test]
    async fn shutdown_sends_partial_batch() {
        let summary = run_one_tick(&unreachable_collector(true)).await;
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.recorded_ticks, 1);
        assert_eq!(summary.flushes, 1);
        assert_eq!(summary.dropped_batches, 1);
    }

    #[tokio::test]
    async fn shutdown_without_final_flush_sends_nothing() {
        let summary = run_one_tick(&unreachable_collector(false)).await;
        assert_eq!(summary.recorded_ticks, 1);
        assert_eq!(summary.flushes, 0);
    }

    #[tokio::test]
    async fn run_until_rejects_invalid_config() {
        let config = Config {
            api_key: None,
            ..config()
        };
        let (_sender, token) = shutdown_channel();
        assert!(run_until(&config, FocusedEditor, token).await.is_err());
    }
}
