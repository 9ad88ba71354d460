use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use stageconfig::StageConfig;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PoseSyncConfig {
    pub notify_url: Url,
    pub webcam_feed: Url,
    pub timeout: Duration,
}

impl PoseSyncConfig {
    pub fn from_stage(config: &StageConfig) -> Result<Self> {
        let backend = &config.backend;
        let notify_url = Url::parse(backend.notify_url.trim())
            .with_context(|| format!("invalid backend.notify_url '{}'", backend.notify_url))?;
        let webcam_feed = resolve_webcam_feed(&backend.webcam_base, &backend.webcam_path)?;
        Ok(Self {
            notify_url,
            webcam_feed,
            timeout: backend.timeout,
        })
    }
}

/// Joins the pose stream base address and path into the image URL the
/// presentation layer renders.
pub fn resolve_webcam_feed(base: &str, path: &str) -> Result<Url> {
    let mut base =
        Url::parse(base.trim()).with_context(|| format!("invalid webcam base url '{base}'"))?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim().trim_start_matches('/'))
        .context("joining webcam feed path")
}

#[derive(Debug, Serialize)]
struct SelectionPayload<'a> {
    exercise: &'a str,
}

#[derive(Debug, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Blocking client for the coaching backend's selection endpoint.
#[derive(Debug, Clone)]
pub struct PoseSyncClient {
    http: Client,
    config: PoseSyncConfig,
}

impl PoseSyncClient {
    pub fn new(config: PoseSyncConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build pose backend HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &PoseSyncConfig {
        &self.config
    }

    /// Sends a single `{"exercise": label}` notification. Any non-success
    /// status or transport error is an error; nothing is retried.
    pub fn select_exercise(&self, label: &str) -> Result<()> {
        if label.trim().is_empty() {
            bail!("exercise label must not be empty");
        }
        let url = self.config.notify_url.clone();
        let response = self
            .http
            .post(url.clone())
            .json(&SelectionPayload { exercise: label })
            .send()
            .with_context(|| format!("posting exercise selection to {url}"))?
            .error_for_status()
            .context("pose backend rejected the exercise selection")?;
        let body = response.text().unwrap_or_default();
        match serde_json::from_str::<Acknowledgement>(&body) {
            Ok(ack) => debug!(
                exercise = label,
                status = ?ack.status,
                message = ?ack.message,
                "pose backend acknowledgement"
            ),
            Err(_) => debug!(
                exercise = label,
                bytes = body.len(),
                "pose backend acknowledged without a JSON body"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_config_from_defaults() {
        let config = PoseSyncConfig::from_stage(&StageConfig::default()).unwrap();
        assert_eq!(config.notify_url.as_str(), "http://localhost:8080/prompt");
        assert_eq!(config.webcam_feed.as_str(), "http://localhost:5001/video_feed");
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn webcam_feed_keeps_base_path() {
        let url = resolve_webcam_feed("http://pose.local:5001/streams", "/video_feed").unwrap();
        assert_eq!(url.as_str(), "http://pose.local:5001/streams/video_feed");
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(resolve_webcam_feed("not a url", "video_feed").is_err());
    }

    #[test]
    fn payload_matches_backend_contract() {
        let body = serde_json::to_value(SelectionPayload { exercise: "Squats" }).unwrap();
        assert_eq!(body, serde_json::json!({ "exercise": "Squats" }));
    }

    #[test]
    fn empty_label_is_rejected_before_sending() {
        let client = PoseSyncClient::new(PoseSyncConfig::from_stage(&StageConfig::default()).unwrap())
            .unwrap();
        assert!(client.select_exercise("  ").is_err());
    }
}
