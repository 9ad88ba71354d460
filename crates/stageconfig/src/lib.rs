use std::collections::HashSet;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FADE: Duration = Duration::from_millis(330);
pub const DEFAULT_NOTIFY_URL: &str = "http://localhost:8080/prompt";
pub const DEFAULT_WEBCAM_BASE: &str = "http://localhost:5001";
pub const DEFAULT_WEBCAM_PATH: &str = "video_feed";
/// Upper bound for every configured transition and the backend timeout.
pub const MAX_DURATION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveSetting {
    Linear,
    #[default]
    Smoothstep,
    #[serde(alias = "ease-in-out", alias = "ease_in_out")]
    EaseInOut,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub version: u32,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_exercises")]
    pub exercises: Vec<ExerciseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Timing {
    #[serde(
        default = "default_fade",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub exercise_fade: Duration,
    #[serde(
        default = "default_fade",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub rendition_fade: Duration,
    #[serde(
        default = "default_fade",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub layout_transition: Duration,
    #[serde(default)]
    pub curve: CurveSetting,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            exercise_fade: DEFAULT_FADE,
            rendition_fade: DEFAULT_FADE,
            layout_transition: DEFAULT_FADE,
            curve: CurveSetting::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Backend {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_notify_url")]
    pub notify_url: String,
    #[serde(default = "default_webcam_base")]
    pub webcam_base: String,
    #[serde(default = "default_webcam_path")]
    pub webcam_path: String,
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            notify_url: default_notify_url(),
            webcam_base: default_webcam_base(),
            webcam_path: default_webcam_path(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExerciseConfig {
    pub id: String,
    pub label: String,
    pub processed: String,
    pub raw: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl ExerciseConfig {
    fn builtin(id: &str, label: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            processed: format!("videos/{id}_processed.mp4"),
            raw: format!("videos/{id}_raw.mp4"),
            icon: Some(icon.to_string()),
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            version: 1,
            timing: Timing::default(),
            backend: Backend::default(),
            exercises: default_exercises(),
        }
    }
}

fn default_exercises() -> Vec<ExerciseConfig> {
    vec![
        ExerciseConfig::builtin("squats", "Squats", "activity"),
        ExerciseConfig::builtin("pushups", "Pushups", "dumbbell"),
        ExerciseConfig::builtin("plank", "Plank", "timer"),
    ]
}

fn default_fade() -> Duration {
    DEFAULT_FADE
}

fn default_enabled() -> bool {
    true
}

fn default_notify_url() -> String {
    DEFAULT_NOTIFY_URL.to_string()
}

fn default_webcam_base() -> String {
    DEFAULT_WEBCAM_BASE.to_string()
}

fn default_webcam_path() -> String {
    DEFAULT_WEBCAM_PATH.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(2)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

/// Durations are written as seconds (`1.5`) or humantime text (`"330ms"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(f64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match DurationValue::deserialize(deserializer)? {
        DurationValue::Seconds(seconds) => Duration::try_from_secs_f64(seconds).map_err(|err| {
            de::Error::custom(format!(
                "duration {seconds} is not a usable number of seconds: {err}"
            ))
        }),
        DurationValue::Text(text) => humantime::parse_duration(text.trim())
            .map_err(|err| de::Error::custom(format!("invalid duration '{text}': {err}"))),
    }
}

impl StageConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: StageConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn exercise(&self, id: &str) -> Option<&ExerciseConfig> {
        self.exercises.iter().find(|entry| entry.id == id)
    }

    /// Full address of the pose stream image, joined without doubling slashes.
    pub fn webcam_feed_url(&self) -> String {
        let base = self.backend.webcam_base.trim_end_matches('/');
        let path = self.backend.webcam_path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.exercises.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one exercise".into(),
            ));
        }

        let mut ids = HashSet::new();
        let mut labels = HashSet::new();
        for entry in &self.exercises {
            if entry.id.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "exercise id may not be empty".into(),
                ));
            }
            if entry.label.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "exercise '{}' label may not be empty",
                    entry.id
                )));
            }
            if entry.processed.trim().is_empty() || entry.raw.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "exercise '{}' must define both processed and raw sources",
                    entry.id
                )));
            }
            if !ids.insert(entry.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate exercise id '{}'",
                    entry.id
                )));
            }
            if !labels.insert(entry.label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate exercise label '{}'",
                    entry.label
                )));
            }
        }

        for (field, value) in [
            ("timing.exercise_fade", self.timing.exercise_fade),
            ("timing.rendition_fade", self.timing.rendition_fade),
            ("timing.layout_transition", self.timing.layout_transition),
            ("backend.timeout", self.backend.timeout),
        ] {
            if value > MAX_DURATION {
                return Err(ConfigError::Invalid(format!(
                    "{field} of {} exceeds the {} limit",
                    humantime::format_duration(value),
                    humantime::format_duration(MAX_DURATION)
                )));
            }
        }

        if self.backend.enabled {
            validate_http_address("backend.notify_url", &self.backend.notify_url)?;
            if self.backend.timeout.is_zero() {
                return Err(ConfigError::Invalid(
                    "backend.timeout must be greater than zero".into(),
                ));
            }
        }
        validate_http_address("backend.webcam_base", &self.backend.webcam_base)?;

        Ok(())
    }
}

fn validate_http_address(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::Invalid(format!(
            "{field} '{value}' is invalid; expected an http:// or https:// address"
        ))),
    }
}
