mod client;
mod notifier;

pub use client::{resolve_webcam_feed, PoseSyncClient, PoseSyncConfig};
pub use notifier::{notify_blocking, ThreadedNotifier};

use anyhow::{Context, Result};
use stageconfig::StageConfig;

/// Builds the selection notifier described by the configuration, or `None`
/// when backend sync is switched off.
pub fn notifier_from_config(config: &StageConfig) -> Result<Option<ThreadedNotifier>> {
    if !config.backend.enabled {
        tracing::info!("pose backend sync disabled in configuration");
        return Ok(None);
    }
    let sync_config =
        PoseSyncConfig::from_stage(config).context("invalid pose backend configuration")?;
    tracing::debug!(
        notify = %sync_config.notify_url,
        webcam = %sync_config.webcam_feed,
        timeout_ms = sync_config.timeout.as_millis() as u64,
        "pose backend sync configured"
    );
    let client = PoseSyncClient::new(sync_config).context("failed to construct pose backend client")?;
    Ok(Some(ThreadedNotifier::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backend_has_no_notifier() {
        let mut config = StageConfig::default();
        config.backend.enabled = false;
        assert!(notifier_from_config(&config).unwrap().is_none());
    }

    #[test]
    fn enabled_backend_builds_notifier() {
        assert!(notifier_from_config(&StageConfig::default())
            .unwrap()
            .is_some());
    }
}
