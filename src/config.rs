use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::TrackerError;

/// Application settings, layered from an optional `trackbot.toml` next
/// to the binary and `TRACKBOT_`-prefixed environment variables
/// (`TRACKBOT_SERVICE__BASE_URL=...`). Every field has a default, so a
/// bare checkout runs against a local service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceSettings,
    pub poller: PollerSettings,
    pub detection: DetectionSettings,
    pub ui: UiSettings,
}

impl Settings {
    pub fn load() -> Result<Self, TrackerError> {
        let source = Config::builder()
            .add_source(File::with_name("trackbot").required(false))
            .add_source(Environment::with_prefix("TRACKBOT").separator("__"))
            .build()?;
        Ok(source.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl ServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    /// Pause between the end of one status probe and the start of the next.
    pub interval_secs: u64,
    /// Overall budget for one task's polling loop.
    pub ceiling_secs: u64,
}

impl PollerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(self.ceiling_secs)
    }
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            ceiling_secs: 600,
        }
    }
}

// Fixed detection parameters forwarded verbatim with every submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub prompt_type: String,
    pub box_threshold: f64,
    pub text_threshold: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            prompt_type: "box".to_string(),
            box_threshold: 0.35,
            text_threshold: 0.25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub default_prompt: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            default_prompt: "cat".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_reference_values() {
        let settings = Settings::default();
        assert_eq!(settings.service.base_url, "http://localhost:5000");
        assert_eq!(settings.poller.interval(), Duration::from_secs(2));
        assert_eq!(settings.poller.ceiling(), Duration::from_secs(600));
        assert_eq!(settings.detection.prompt_type, "box");
        assert_eq!(settings.detection.box_threshold, 0.35);
        assert_eq!(settings.detection.text_threshold, 0.25);
        assert_eq!(settings.ui.default_prompt, "cat");
    }
}
