// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Application configuration (sound preferences, backend behavior).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sound preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Allow raising the output volume above 100% (Ubuntu desktop only).
    pub allow_amplified_volume: bool,
    /// Delay before a volume change is announced, in milliseconds.
    pub notify_delay_ms: u64,
    /// Play the volume-change sound.
    pub feedback: bool,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            allow_amplified_volume: false,
            notify_delay_ms: 30,
            feedback: true,
        }
    }
}

impl SoundConfig {
    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.notify_delay_ms)
    }
}

/// Mixer backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// How often the PipeWire graph is re-read, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

impl BackendConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sound: SoundConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Load config from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.sound.notify_delay(), Duration::from_millis(30));
    }

    #[test]
    fn test_partial_section() {
        let config = AppConfig::from_toml("[sound]\nallow_amplified_volume = true\n").unwrap();
        assert!(config.sound.allow_amplified_volume);
        assert!(config.sound.feedback);
        assert_eq!(config.backend.poll_interval_ms, 500);
    }

    #[test]
    fn test_round_trip() {
        let mut config = AppConfig::default();
        config.sound.notify_delay_ms = 50;
        config.backend.poll_interval_ms = 250;
        let parsed = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
